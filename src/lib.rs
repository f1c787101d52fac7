//! # FC Comms Library
//!
//! Poll a flight controller over MSP and republish its telemetry.
//!
//! This library provides the MSP message catalog and codec, the connection
//! state machine that drives reconnects and poll cycles, a serial link
//! driver, and telemetry sinks.

pub mod config;
pub mod error;
pub mod msp;
pub mod comms;
pub mod serial;
pub mod telemetry;
