//! CRC primitives for the frame header and trailer.
//!
//! Both checksums are computed MSB-first without reflection. The polynomials
//! come from Koopman's tables: CRC-8 0x37 protects a 4-byte payload against
//! up to 5 flipped bits, CRC-16 0x3D65 (CRC-16-DNP) protects a 135-byte
//! payload against up to 5 flipped bits. The framing layer stays well inside
//! both bounds.

/// Polynomial for the header checksum: x^8 + x^5 + x^4 + x^2 + x + 1.
pub const CRC8_POLYNOMIAL: u8 = 0x37;

/// Seed for the header checksum.
pub const CRC8_INIT: u8 = 0x42;

/// Polynomial for the trailer checksum (CRC-16-DNP).
pub const CRC16_POLYNOMIAL: u16 = 0x3d65;

/// Seed for the trailer checksum.
pub const CRC16_INIT: u16 = 0x1337;

/// Compute the CRC-8 of `data`, continuing from `init`.
///
/// Passing the result of one call as the seed of the next is equivalent to
/// checksumming the concatenated input.
pub fn crc8(init: u8, data: &[u8]) -> u8 {
    let mut remainder = init;
    for &byte in data {
        remainder ^= byte;
        for _ in 0..8 {
            remainder = if remainder & 0x80 != 0 {
                (remainder << 1) ^ CRC8_POLYNOMIAL
            } else {
                remainder << 1
            };
        }
    }
    remainder
}

/// Compute the CRC-16 of `data`, continuing from `init`.
pub fn crc16(init: u16, data: &[u8]) -> u16 {
    let mut remainder = init;
    for &byte in data {
        remainder ^= (byte as u16) << 8;
        for _ in 0..8 {
            remainder = if remainder & 0x8000 != 0 {
                (remainder << 1) ^ CRC16_POLYNOMIAL
            } else {
                remainder << 1
            };
        }
    }
    remainder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_seed() {
        assert_eq!(crc8(CRC8_INIT, &[]), CRC8_INIT);
        assert_eq!(crc16(CRC16_INIT, &[]), CRC16_INIT);
    }

    #[test]
    fn crc8_known_value() {
        // Hand-computed: seed 0x42, single byte 0x06, poly 0x37, MSB-first.
        assert_eq!(crc8(CRC8_INIT, &[0x06]), 0x78);
    }

    #[test]
    fn crc_is_incremental() {
        let data = b"axlink frame checksum";
        let (a, b) = data.split_at(7);

        assert_eq!(crc8(crc8(CRC8_INIT, a), b), crc8(CRC8_INIT, data));
        assert_eq!(crc16(crc16(CRC16_INIT, a), b), crc16(CRC16_INIT, data));
    }

    #[test]
    fn crc8_detects_any_single_bit_flip() {
        let original = [0x7Fu8];
        let reference = crc8(CRC8_INIT, &original);
        for bit in 0..8 {
            let mut corrupted = original;
            corrupted[0] ^= 1 << bit;
            assert_ne!(crc8(CRC8_INIT, &corrupted), reference, "bit {bit}");
        }
    }

    #[test]
    fn crc16_detects_any_single_bit_flip() {
        let original: Vec<u8> = (0..125u8).collect();
        let reference = crc16(CRC16_INIT, &original);
        for byte in 0..original.len() {
            for bit in 0..8 {
                let mut corrupted = original.clone();
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    crc16(CRC16_INIT, &corrupted),
                    reference,
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn different_seeds_give_different_checksums() {
        let data = b"seed sensitivity";
        assert_ne!(crc16(CRC16_INIT, data), crc16(0, data));
    }
}
