//! CRC-8 frame integrity check.
//!
//! Polynomial 0x07, initial value 0x00, MSB-first, no reflection: the same
//! routine the gateway firmware appends to sync-sample frames.

/// Compute the CRC-8 of `data`.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0x00;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vector() {
        // CRC-8 (poly 0x07, init 0x00) check value for "123456789".
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn test_single_bit_flip_always_detected() {
        let payload: Vec<u8> = (0u8..64).collect();
        let reference = crc8(&payload);

        for byte_index in 0..payload.len() {
            for bit in 0..8 {
                let mut corrupted = payload.clone();
                corrupted[byte_index] ^= 1 << bit;
                assert_ne!(
                    crc8(&corrupted),
                    reference,
                    "flip at byte {byte_index} bit {bit} went undetected"
                );
            }
        }
    }
}
