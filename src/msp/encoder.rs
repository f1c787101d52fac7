//! # MSP Request Encoder
//!
//! Frames requests for the flight controller and packs SET_RAW_RC payloads.

use bytes::{BufMut, Bytes, BytesMut};

use super::checksum::msp_checksum;
use super::protocol::*;
use crate::error::Result;

/// Encode a request into a complete MSP v1 frame
///
/// The length byte always equals the payload length, which
/// [`RequestMessage::new`] has already matched to the descriptor.
///
/// # Returns
///
/// * `Bytes` - `$M<` + length + id + payload + checksum
///
/// # Examples
///
/// ```
/// use fc_comms::msp::encoder::encode_request_frame;
/// use fc_comms::msp::protocol::{RequestMessage, MSP_STATUS};
///
/// let request = RequestMessage::empty(MSP_STATUS).unwrap();
/// let frame = encode_request_frame(&request);
/// assert_eq!(&frame[..], b"$M<\x00\x65\x65");
/// ```
pub fn encode_request_frame(request: &RequestMessage) -> Bytes {
    let descriptor = request.descriptor();
    let payload = request.payload();
    let length = payload.len() as u8;

    let mut frame = BytesMut::with_capacity(MSP_FRAME_OVERHEAD + payload.len());
    frame.put_slice(&MSP_PREAMBLE);
    frame.put_u8(MSP_DIRECTION_REQUEST);
    frame.put_u8(length);
    frame.put_u8(descriptor.id);
    frame.put_slice(payload);
    frame.put_u8(msp_checksum(length, descriptor.id, payload));

    frame.freeze()
}

/// Pack 8 RC channel values into a SET_RAW_RC payload
///
/// Each value is written little-endian, in channel order.
pub fn encode_rc_channels(values: &RawRcChannels) -> [u8; MSP_SET_RAW_RC_PAYLOAD_SIZE] {
    let mut payload = [0u8; MSP_SET_RAW_RC_PAYLOAD_SIZE];

    for (chunk, value) in payload.chunks_exact_mut(2).zip(values.iter()) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }

    payload
}

/// Build a ready-to-send SET_RAW_RC request
pub fn set_raw_rc_request(values: &RawRcChannels) -> Result<RequestMessage> {
    RequestMessage::new(MSP_SET_RAW_RC, encode_rc_channels(values).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_request_frame() {
        let request = RequestMessage::empty(MSP_IDENT).unwrap();
        let frame = encode_request_frame(&request);

        // Frame should be 6 bytes: preamble(2) + direction(1) + length(1) + id(1) + checksum(1)
        assert_eq!(frame.len(), MSP_FRAME_OVERHEAD);
        assert_eq!(&frame[..2], b"$M");
        assert_eq!(frame[2], b'<');
        assert_eq!(frame[3], 0);
        assert_eq!(frame[4], 100);
        assert_eq!(frame[5], 100);
    }

    #[test]
    fn test_encode_frame_length_matches_payload() {
        let request = set_raw_rc_request(&[1500; 8]).unwrap();
        let frame = encode_request_frame(&request);

        assert_eq!(frame.len(), MSP_FRAME_OVERHEAD + 16);
        assert_eq!(frame[3], 16);
        assert_eq!(frame[4], 200);
        assert_eq!(&frame[5..21], request.payload());
        assert_eq!(frame[21], msp_checksum(16, 200, request.payload()));
    }

    #[test]
    fn test_encode_rc_channels_all_zeros() {
        assert_eq!(encode_rc_channels(&[0; 8]), [0u8; 16]);
    }

    #[test]
    fn test_encode_rc_channels_sequence() {
        let payload = encode_rc_channels(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            payload,
            [1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7, 0, 8, 0]
        );
    }

    #[test]
    fn test_encode_rc_channels_little_endian() {
        let payload = encode_rc_channels(&[1500, 2000, 1000, 0xABCD, 0, 0, 0, u16::MAX]);
        assert_eq!(&payload[0..2], &[0xDC, 0x05]); // 1500
        assert_eq!(&payload[2..4], &[0xD0, 0x07]); // 2000
        assert_eq!(&payload[4..6], &[0xE8, 0x03]); // 1000
        assert_eq!(&payload[6..8], &[0xCD, 0xAB]);
        assert_eq!(&payload[14..16], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_different_payload_different_checksum() {
        let frame1 = encode_request_frame(&set_raw_rc_request(&[1000; 8]).unwrap());
        let mut channels = [1000; 8];
        channels[0] = 1001;
        let frame2 = encode_request_frame(&set_raw_rc_request(&channels).unwrap());
        assert_ne!(frame1[21], frame2[21]);
    }
}
