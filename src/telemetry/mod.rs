//! # Telemetry Module
//!
//! Output side of the bridge: where decoded flight-controller values go.
//!
//! This module handles:
//! - The `TelemetrySink` capability (battery and flight-status channels)
//! - Logging every record through `tracing` (`LogSink`)
//! - Writing records to rotating JSONL files (`logger::JsonlSink`)

pub mod logger;

use tracing::info;

use crate::error::Result;
use crate::msp::protocol::FlightStatus;

/// Output channel for battery voltage records
pub const BATTERY_TOPIC: &str = "fc_battery";

/// Output channel for flight-status records
pub const STATUS_TOPIC: &str = "fc_status";

/// Receiver of decoded telemetry, fed once per successful poll
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink: Send {
    /// Register the output channels; called once from `FcComms::init`
    fn register(&mut self) -> Result<()>;

    /// Publish the battery voltage in volts
    fn publish_battery(&mut self, volts: f32) -> Result<()>;

    /// Publish the flight-status record
    fn publish_status(&mut self, status: &FlightStatus) -> Result<()>;
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn register(&mut self) -> Result<()> {
        (**self).register()
    }

    fn publish_battery(&mut self, volts: f32) -> Result<()> {
        (**self).publish_battery(volts)
    }

    fn publish_status(&mut self, status: &FlightStatus) -> Result<()> {
        (**self).publish_status(status)
    }
}

/// Sink that reports every record through `tracing`
#[derive(Debug, Default)]
pub struct LogSink {
    published: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records published so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl TelemetrySink for LogSink {
    fn register(&mut self) -> Result<()> {
        info!("Telemetry outputs registered: {}, {}", BATTERY_TOPIC, STATUS_TOPIC);
        Ok(())
    }

    fn publish_battery(&mut self, volts: f32) -> Result<()> {
        self.published += 1;
        info!(topic = BATTERY_TOPIC, volts, "Battery");
        Ok(())
    }

    fn publish_status(&mut self, status: &FlightStatus) -> Result<()> {
        self.published += 1;
        info!(
            topic = STATUS_TOPIC,
            armed = status.armed,
            autopilot = status.autopilot,
            failsafe = status.failsafe,
            "Flight status"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(BATTERY_TOPIC, "fc_battery");
        assert_eq!(STATUS_TOPIC, "fc_status");
    }

    #[test]
    fn test_log_sink_counts_records() {
        let mut sink = LogSink::new();
        tokio_test::assert_ok!(sink.register());
        tokio_test::assert_ok!(sink.publish_battery(11.1));
        tokio_test::assert_ok!(sink.publish_status(&FlightStatus::default()));
        assert_eq!(sink.published(), 2);
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut mock = MockTelemetrySink::new();
        mock.expect_register().times(1).returning(|| Ok(()));
        mock.expect_publish_battery()
            .withf(|volts| (*volts - 16.8).abs() < 1e-6)
            .times(1)
            .returning(|_| Ok(()));

        let mut boxed: Box<dyn TelemetrySink> = Box::new(mock);
        assert!(boxed.register().is_ok());
        assert!(boxed.publish_battery(16.8).is_ok());
    }
}
