//! # MSP Protocol Module
//!
//! Implementation of the MultiWii Serial Protocol (v1) subset used to poll
//! the flight controller.
//!
//! This module handles:
//! - The fixed command catalog (IDENT, STATUS, RC, ANALOG, SET_RAW_RC)
//! - Request framing and XOR checksum calculation
//! - Reply validation and per-command payload decoding

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod checksum;
