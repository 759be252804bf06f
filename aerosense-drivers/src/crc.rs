//! Sensirion CRC-8 (polynomial 0x31, init 0xFF)
//!
//! Used by the SHT4x and SHTC3 families over every 2-byte word they send.

/// Computes the Sensirion CRC-8 over `data`.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x31;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Checks a received CRC byte against the data it covers.
pub fn check(data: &[u8], received: u8) -> Result<(), crate::SampleError> {
    let expected = crc8(data);
    if expected == received {
        Ok(())
    } else {
        Err(crate::SampleError::CrcMismatch {
            expected,
            actual: received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_vectors() {
        // From the Sensirion SHT4x datasheet CRC example
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
        assert_eq!(crc8(&[0x00, 0x00]), 0x81);
    }

    #[test]
    fn check_accepts_and_rejects() {
        assert!(check(&[0xBE, 0xEF], 0x92).is_ok());
        let err = check(&[0xBE, 0xEF], 0x93).unwrap_err();
        assert!(matches!(
            err,
            crate::SampleError::CrcMismatch {
                expected: 0x92,
                actual: 0x93
            }
        ));
    }
}
