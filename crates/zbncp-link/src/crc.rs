//! Header and body checksums.
//!
//! The link header is protected by an 8-bit CRC over the six bytes that
//! precede it. Every logical message opens with a 16-bit CRC over the
//! message bytes that follow it.

use ::crc::{Algorithm, Crc, CRC_16_KERMIT};

/// CRC-8 used for link frame headers.
///
/// Polynomial 0xA7, reflected, zero init, output inverted.
pub const CRC_8_ZBNCP: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0xa7,
    init: 0x00,
    refin: true,
    refout: true,
    xorout: 0xff,
    check: 0xd9,
    residue: 0x9f,
};

const HEADER_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_ZBNCP);
const BODY_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_KERMIT);

/// Compute the header CRC-8 over `data`.
pub fn header_crc8(data: &[u8]) -> u8 {
    HEADER_CRC.checksum(data)
}

/// Compute the body CRC-16 over `data`.
pub fn body_crc16(data: &[u8]) -> u16 {
    BODY_CRC.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_crc_check_value() {
        assert_eq!(header_crc8(b"123456789"), 0xD9);
    }

    #[test]
    fn test_body_crc_check_value() {
        assert_eq!(body_crc16(b"123456789"), 0x2189);
    }

    #[test]
    fn test_header_crc_sample_frame() {
        assert_eq!(header_crc8(&[0xDE, 0xAD, 0x06, 0x00, 0x01, 0x40]), 0x7A);
    }

    #[test]
    fn test_crc_is_pure() {
        let data = [0x01, 0x02, 0x03, 0xFE];
        assert_eq!(header_crc8(&data), header_crc8(&data));
        assert_eq!(body_crc16(&data), body_crc16(&data));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(body_crc16(&[]), 0);
        assert_eq!(header_crc8(&[]), 0xFF);
    }
}
