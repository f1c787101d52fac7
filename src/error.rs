//! # Error Types
//!
//! Custom error types for FC Comms using `thiserror`.

use thiserror::Error;

/// Main error type for FC Comms
#[derive(Debug, Error)]
pub enum FcCommsError {
    /// Link driver I/O failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Link driver call did not complete in time
    #[error("Link timed out after {0} ms")]
    Timeout(u64),

    /// None of the candidate serial devices could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Malformed frame or payload shorter than a decoder needs
    #[error("MSP decode error: {0}")]
    Decode(String),

    /// Catalog or request construction broke a fixed invariant
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Telemetry sink errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FcCommsError {
    /// True for errors that mean the link can no longer be trusted
    /// (transport failures, timeouts, malformed exchanges).
    pub fn is_link_fault(&self) -> bool {
        matches!(
            self,
            FcCommsError::Transport(_)
                | FcCommsError::Timeout(_)
                | FcCommsError::SerialPortNotFound(_)
                | FcCommsError::Decode(_)
                | FcCommsError::Io(_)
        )
    }
}

/// Result type alias for FC Comms
pub type Result<T> = std::result::Result<T, FcCommsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_fault_classification() {
        assert!(FcCommsError::Transport("gone".into()).is_link_fault());
        assert!(FcCommsError::Timeout(100).is_link_fault());
        assert!(FcCommsError::Decode("short".into()).is_link_fault());
        assert!(!FcCommsError::Invariant("dup".into()).is_link_fault());
        assert!(!FcCommsError::Telemetry("disk".into()).is_link_fault());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(FcCommsError::Timeout(250).to_string(), "Link timed out after 250 ms");
        assert_eq!(
            FcCommsError::Decode("bad checksum".into()).to_string(),
            "MSP decode error: bad checksum"
        );
    }
}
