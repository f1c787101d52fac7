//! # MSP Response Decoder
//!
//! Validates reply frames and decodes STATUS, ANALOG, RC and IDENT payloads.

use tracing::debug;

use super::checksum::msp_checksum;
use super::protocol::*;
use crate::error::{FcCommsError, Result};

/// Parse and validate a complete MSP v1 frame
///
/// # Errors
///
/// Returns `FcCommsError::Decode` if:
/// - Frame is too short for its header or declared length
/// - Preamble or direction marker is wrong
/// - Declared length exceeds `MSP_MAX_PAYLOAD_SIZE`
/// - Checksum check fails
pub fn parse_frame(frame: &[u8]) -> Result<MspFrame> {
    if frame.len() < MSP_FRAME_OVERHEAD {
        return Err(FcCommsError::Decode(format!(
            "Frame too short: {} bytes",
            frame.len()
        )));
    }

    if frame[..2] != MSP_PREAMBLE {
        return Err(FcCommsError::Decode(format!(
            "Invalid preamble: {:02X?}",
            &frame[..2]
        )));
    }

    let direction = frame[2];
    if ![MSP_DIRECTION_REQUEST, MSP_DIRECTION_RESPONSE, MSP_DIRECTION_ERROR].contains(&direction) {
        return Err(FcCommsError::Decode(format!(
            "Invalid direction marker: 0x{:02X}",
            direction
        )));
    }

    let length = frame[3] as usize;
    if length > MSP_MAX_PAYLOAD_SIZE {
        return Err(FcCommsError::Decode(format!(
            "Payload length {} exceeds maximum {}",
            length, MSP_MAX_PAYLOAD_SIZE
        )));
    }

    if frame.len() != MSP_FRAME_OVERHEAD + length {
        return Err(FcCommsError::Decode(format!(
            "Frame size mismatch: expected {} bytes, got {}",
            MSP_FRAME_OVERHEAD + length,
            frame.len()
        )));
    }

    let id = frame[4];
    let payload = &frame[MSP_HEADER_SIZE..MSP_HEADER_SIZE + length];
    let received = frame[MSP_HEADER_SIZE + length];
    let calculated = msp_checksum(frame[3], id, payload);

    if calculated != received {
        return Err(FcCommsError::Decode(format!(
            "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
            calculated, received
        )));
    }

    Ok(MspFrame {
        direction,
        id,
        payload: payload.to_vec(),
    })
}

/// Turn the bytes received for `descriptor` into a `ResponseMessage`
///
/// Anything other than a well-formed `>` frame carrying the same id is
/// reported as invalid; the reason is logged at debug level.
pub fn decode_response_frame(descriptor: CommandDescriptor, frame: &[u8]) -> ResponseMessage {
    let parsed = match parse_frame(frame) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Rejected {} reply: {}", descriptor.name, e);
            return ResponseMessage::invalid(descriptor);
        }
    };

    if parsed.direction != MSP_DIRECTION_RESPONSE {
        debug!(
            "Rejected {} reply: direction '{}'",
            descriptor.name, parsed.direction as char
        );
        return ResponseMessage::invalid(descriptor);
    }

    if parsed.id != descriptor.id {
        debug!(
            "Rejected {} reply: carries id {} instead of {}",
            descriptor.name, parsed.id, descriptor.id
        );
        return ResponseMessage::invalid(descriptor);
    }

    ResponseMessage::valid(descriptor, parsed.payload)
}

fn require_len(raw: &[u8], min: usize, what: &str) -> Result<()> {
    if raw.len() < min {
        return Err(FcCommsError::Decode(format!(
            "{} payload too short: {} bytes, need {}",
            what,
            raw.len(),
            min
        )));
    }
    Ok(())
}

/// Decode the 18 RC channels of an MSP_RC reply
///
/// Channel k is `raw[2k] | raw[2k+1] << 8`.
///
/// # Arguments
///
/// * `raw` - MSP_RC payload; bytes past the 36th are ignored
///
/// # Returns
///
/// All 18 channel values in microseconds
///
/// # Errors
///
/// Returns `FcCommsError::Decode` if `raw` holds fewer than 36 bytes.
///
/// # Examples
///
/// ```
/// use fc_comms::msp::decoder::decode_rc_channels;
///
/// let mut raw = [0u8; 36];
/// raw[0..2].copy_from_slice(&1500u16.to_le_bytes());
/// let channels = decode_rc_channels(&raw).unwrap();
/// assert_eq!(channels[0], 1500);
/// assert_eq!(channels[17], 0);
/// ```
pub fn decode_rc_channels(raw: &[u8]) -> Result<RcChannels> {
    require_len(raw, MSP_RC_PAYLOAD_SIZE, "RC")?;

    let mut channels = [0u16; MSP_RC_CHANNEL_COUNT];
    for (channel, bytes) in channels.iter_mut().zip(raw.chunks_exact(2)) {
        *channel = u16::from_le_bytes([bytes[0], bytes[1]]);
    }

    Ok(channels)
}

/// Whether the auto-mode switch (9th channel) of an MSP_RC reply is high
///
/// The switch counts as high strictly above 1500.
///
/// # Errors
///
/// Returns `FcCommsError::Decode` if `raw` is too short to hold channel 9.
pub fn decode_auto_enabled(raw: &[u8]) -> Result<bool> {
    let offset = MSP_AUTO_CHANNEL_INDEX * 2;
    require_len(raw, offset + 2, "RC")?;

    let aux5 = u16::from_le_bytes([raw[offset], raw[offset + 1]]);
    Ok(aux5 > PWM_SWITCH_THRESHOLD)
}

/// Battery voltage of an MSP_ANALOG reply, in volts (0.1 V resolution)
///
/// # Arguments
///
/// * `raw` - MSP_ANALOG payload; only byte 0 is read
///
/// # Errors
///
/// Returns `FcCommsError::Decode` if `raw` is empty.
///
/// # Examples
///
/// ```
/// use fc_comms::msp::decoder::decode_voltage;
///
/// assert_eq!(decode_voltage(&[250, 1, 2]).unwrap(), 25.0);
/// assert!(decode_voltage(&[]).is_err());
/// ```
pub fn decode_voltage(raw: &[u8]) -> Result<f32> {
    require_len(raw, 1, "ANALOG")?;
    Ok(raw[0] as f32 / 10.0)
}

/// Armed flag of an MSP_STATUS reply
///
/// The mode flags word sits at bytes 6..10; only bit 0 (armed) is read.
///
/// # Arguments
///
/// * `raw` - MSP_STATUS payload
///
/// # Errors
///
/// Returns `FcCommsError::Decode` if `raw` holds fewer than 10 bytes.
///
/// # Examples
///
/// ```
/// use fc_comms::msp::decoder::decode_armed_flag;
///
/// let mut raw = [0u8; 11];
/// raw[6] = 0x01;
/// assert!(decode_armed_flag(&raw).unwrap());
///
/// raw[6] = 0x02;
/// assert!(!decode_armed_flag(&raw).unwrap());
/// ```
pub fn decode_armed_flag(raw: &[u8]) -> Result<bool> {
    require_len(raw, MSP_STATUS_MIN_PAYLOAD_SIZE, "STATUS")?;

    let flags = u32::from_le_bytes([raw[6], raw[7], raw[8], raw[9]]);
    Ok(flags & 0x1 != 0)
}

/// Firmware identity of an MSP_IDENT reply
///
/// # Errors
///
/// Returns `FcCommsError::Decode` if `raw` holds fewer than 7 bytes.
pub fn decode_ident(raw: &[u8]) -> Result<FcIdent> {
    require_len(raw, MSP_IDENT_PAYLOAD_SIZE, "IDENT")?;

    Ok(FcIdent {
        version: raw[0],
        multitype: raw[1],
        msp_version: raw[2],
        capability: u32::from_le_bytes([raw[3], raw[4], raw[5], raw[6]]),
    })
}

/// Build a reply frame the way the firmware would (test helper)
#[cfg(test)]
pub(crate) fn response_frame(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![b'$', b'M', MSP_DIRECTION_RESPONSE, payload.len() as u8, id];
    frame.extend_from_slice(payload);
    frame.push(msp_checksum(payload.len() as u8, id, payload));
    frame
}
