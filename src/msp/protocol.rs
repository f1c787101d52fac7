//! # MSP Protocol Constants and Types
//!
//! Core protocol definitions for MSP v1 (MultiWii Serial Protocol) and the
//! fixed catalog of commands this bridge speaks.

use serde::Serialize;

use crate::error::{FcCommsError, Result};

/// Frame preamble (`$M`)
pub const MSP_PREAMBLE: [u8; 2] = [b'$', b'M'];

/// Direction marker for host-to-FC requests
pub const MSP_DIRECTION_REQUEST: u8 = b'<';

/// Direction marker for FC-to-host replies
pub const MSP_DIRECTION_RESPONSE: u8 = b'>';

/// Direction marker the FC uses when it rejects a command
pub const MSP_DIRECTION_ERROR: u8 = b'!';

/// Header size: preamble(2) + direction(1) + length(1) + id(1)
pub const MSP_HEADER_SIZE: usize = 5;

/// Frame overhead: header(5) + checksum(1)
pub const MSP_FRAME_OVERHEAD: usize = MSP_HEADER_SIZE + 1;

/// Maximum payload size accepted in either direction
pub const MSP_MAX_PAYLOAD_SIZE: usize = 64;

/// Number of RC channels reported by MSP_RC
pub const MSP_RC_CHANNEL_COUNT: usize = 18;

/// Minimum MSP_RC payload (18 channels × 2 bytes)
pub const MSP_RC_PAYLOAD_SIZE: usize = MSP_RC_CHANNEL_COUNT * 2;

/// Number of channels carried by MSP_SET_RAW_RC
pub const MSP_SET_RAW_RC_CHANNEL_COUNT: usize = 8;

/// MSP_SET_RAW_RC payload (8 channels × 2 bytes)
pub const MSP_SET_RAW_RC_PAYLOAD_SIZE: usize = MSP_SET_RAW_RC_CHANNEL_COUNT * 2;

/// Minimum MSP_STATUS payload to reach the mode flags word (bytes 6..10)
pub const MSP_STATUS_MIN_PAYLOAD_SIZE: usize = 10;

/// Minimum MSP_IDENT payload: version, multitype, msp version, capability(4)
pub const MSP_IDENT_PAYLOAD_SIZE: usize = 7;

/// Channel index of the auto-mode switch (AUX5)
pub const MSP_AUTO_CHANNEL_INDEX: usize = 8;

/// PWM value above which a switch reads as enabled
pub const PWM_SWITCH_THRESHOLD: u16 = 1500;

/// RC channel array as reported by MSP_RC
pub type RcChannels = [u16; MSP_RC_CHANNEL_COUNT];

/// RC channel array as sent by MSP_SET_RAW_RC
pub type RawRcChannels = [u16; MSP_SET_RAW_RC_CHANNEL_COUNT];

/// Wire identity of one supported command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Message id byte
    pub id: u8,

    /// Exact request payload length
    pub request_len: u8,

    /// Whether the firmware answers this command
    pub has_response: bool,

    /// Diagnostic name
    pub name: &'static str,
}

pub const MSP_IDENT: CommandDescriptor = CommandDescriptor {
    id: 100,
    request_len: 0,
    has_response: true,
    name: "MSP_IDENT",
};

pub const MSP_STATUS: CommandDescriptor = CommandDescriptor {
    id: 101,
    request_len: 0,
    has_response: true,
    name: "MSP_STATUS",
};

pub const MSP_RC: CommandDescriptor = CommandDescriptor {
    id: 105,
    request_len: 0,
    has_response: true,
    name: "MSP_RC",
};

pub const MSP_ANALOG: CommandDescriptor = CommandDescriptor {
    id: 110,
    request_len: 0,
    has_response: true,
    name: "MSP_ANALOG",
};

pub const MSP_SET_RAW_RC: CommandDescriptor = CommandDescriptor {
    id: 200,
    request_len: MSP_SET_RAW_RC_PAYLOAD_SIZE as u8,
    has_response: false,
    name: "MSP_SET_RAW_RC",
};

/// Every command this bridge speaks
pub const CATALOG: [CommandDescriptor; 5] =
    [MSP_IDENT, MSP_STATUS, MSP_RC, MSP_ANALOG, MSP_SET_RAW_RC];

/// Find a catalog entry by message id
pub fn lookup(id: u8) -> Option<&'static CommandDescriptor> {
    CATALOG.iter().find(|d| d.id == id)
}

/// Check a catalog for duplicate ids and oversized request payloads
///
/// # Errors
///
/// Returns `FcCommsError::Invariant` naming the offending descriptor.
pub fn validate_catalog(catalog: &[CommandDescriptor]) -> Result<()> {
    for (i, descriptor) in catalog.iter().enumerate() {
        if let Some(other) = catalog[..i].iter().find(|d| d.id == descriptor.id) {
            return Err(FcCommsError::Invariant(format!(
                "duplicate message id {} ({} and {})",
                descriptor.id, other.name, descriptor.name
            )));
        }

        if descriptor.request_len as usize > MSP_MAX_PAYLOAD_SIZE {
            return Err(FcCommsError::Invariant(format!(
                "{} request length {} exceeds maximum {}",
                descriptor.name, descriptor.request_len, MSP_MAX_PAYLOAD_SIZE
            )));
        }
    }

    Ok(())
}

/// A request ready for the codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    descriptor: CommandDescriptor,
    payload: Vec<u8>,
}

impl RequestMessage {
    /// Create a request, checking the payload length against the descriptor
    ///
    /// # Errors
    ///
    /// Returns `FcCommsError::Invariant` if `payload.len()` differs from
    /// `descriptor.request_len`.
    pub fn new(descriptor: CommandDescriptor, payload: Vec<u8>) -> Result<Self> {
        if payload.len() != descriptor.request_len as usize {
            return Err(FcCommsError::Invariant(format!(
                "{} expects a {}-byte payload, got {}",
                descriptor.name,
                descriptor.request_len,
                payload.len()
            )));
        }

        Ok(Self { descriptor, payload })
    }

    /// Create a request for a command that carries no payload
    pub fn empty(descriptor: CommandDescriptor) -> Result<Self> {
        Self::new(descriptor, Vec::new())
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// A reply parsed by the codec
///
/// An invalid response never exposes payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    descriptor: CommandDescriptor,
    raw_payload: Vec<u8>,
    valid: bool,
}

impl ResponseMessage {
    pub(crate) fn valid(descriptor: CommandDescriptor, raw_payload: Vec<u8>) -> Self {
        debug_assert!(raw_payload.len() <= MSP_MAX_PAYLOAD_SIZE);
        Self {
            descriptor,
            raw_payload,
            valid: true,
        }
    }

    pub(crate) fn invalid(descriptor: CommandDescriptor) -> Self {
        Self {
            descriptor,
            raw_payload: Vec::new(),
            valid: false,
        }
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Payload bytes of a valid response
    ///
    /// # Errors
    ///
    /// Returns `FcCommsError::Decode` if the frame failed validation.
    pub fn payload(&self) -> Result<&[u8]> {
        if !self.valid {
            return Err(FcCommsError::Decode(format!(
                "invalid {} response",
                self.descriptor.name
            )));
        }
        Ok(&self.raw_payload)
    }
}

/// A validated MSP frame, before it is matched to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MspFrame {
    /// Direction marker (`<`, `>` or `!`)
    pub direction: u8,

    /// Message id
    pub id: u8,

    /// Payload data (max 64 bytes)
    pub payload: Vec<u8>,
}

/// Firmware identity reported by MSP_IDENT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FcIdent {
    /// Firmware version
    pub version: u8,

    /// Airframe type
    pub multitype: u8,

    /// MSP protocol version
    pub msp_version: u8,

    /// Capability bit field
    pub capability: u32,
}

/// Flight-status record published once per poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FlightStatus {
    pub armed: bool,
    pub autopilot: bool,
    pub failsafe: bool,
}

/// Decoded values of one successful poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub armed: bool,
    pub autopilot: bool,
    pub failsafe: bool,

    /// Battery voltage in volts
    pub battery_volts: f32,
}

impl TelemetrySnapshot {
    pub fn status(&self) -> FlightStatus {
        FlightStatus {
            armed: self.armed,
            autopilot: self.autopilot,
            failsafe: self.failsafe,
        }
    }
}
