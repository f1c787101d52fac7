//! # MSP v1 Checksum
//!
//! XOR of the length byte, the message id and every payload byte.

/// Calculate the MSP v1 checksum
///
/// # Arguments
///
/// * `length` - Payload length byte
/// * `id` - Message id byte
/// * `payload` - Payload bytes
///
/// # Examples
///
/// ```
/// use fc_comms::msp::checksum::msp_checksum;
///
/// // MSP_STATUS request: no payload
/// assert_eq!(msp_checksum(0, 101, &[]), 101);
/// ```
pub fn msp_checksum(length: u8, id: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(length ^ id, |acc, &byte| acc ^ byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty_payload() {
        assert_eq!(msp_checksum(0, 0, &[]), 0);
        assert_eq!(msp_checksum(0, 100, &[]), 100);
        assert_eq!(msp_checksum(0, 110, &[]), 110);
    }

    #[test]
    fn test_checksum_covers_length_and_id() {
        // 16 ^ 200 = 0xD8
        assert_eq!(msp_checksum(16, 200, &[0u8; 16]), 0xD8);
    }

    #[test]
    fn test_checksum_covers_payload() {
        let base = msp_checksum(2, 105, &[0x12, 0x34]);
        let changed = msp_checksum(2, 105, &[0x12, 0x35]);
        assert_ne!(base, changed, "Checksum should change when data changes");
        assert_eq!(base, 2 ^ 105 ^ 0x12 ^ 0x34);
    }

    #[test]
    fn test_checksum_self_cancels() {
        // XOR-ing the checksum back in yields zero
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        let crc = msp_checksum(4, 101, &payload);
        let mut all = vec![4u8, 101];
        all.extend_from_slice(&payload);
        all.push(crc);
        assert_eq!(all.iter().fold(0, |acc, b| acc ^ b), 0);
    }
}
