//! CRC-16 checksum for sensor frames.
//!
//! CRC-16/CCITT with polynomial `0x1021`, initial value `0xFFFF`, no input or
//! output reflection and no final XOR (catalogued as CRC-16/IBM-3740). The
//! calculator uses a 256-entry lookup table, processing one byte per step as
//! `crc = (crc << 8) ^ table[(crc >> 8) ^ byte]`.

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT calculator with 256-entry lookup table.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Checksum of an empty input (the initial register value).
pub const CRC16_INIT: u16 = 0xFFFF;

/// Calculate the CRC-16/CCITT checksum of a byte slice.
#[inline]
#[must_use]
pub fn checksum(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// CRC-16 digest for incremental calculation.
///
/// Used by the frame encoder, which checksums fields as it writes them.
pub struct Crc16Digest {
    digest: crc::Digest<'static, u16>,
}

impl Crc16Digest {
    /// Create a new CRC-16 digest.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            digest: CRC16.digest(),
        }
    }

    /// Update the digest with a byte slice.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Finalize and return the checksum value.
    #[inline]
    #[must_use]
    pub fn finalize(self) -> u16 {
        self.digest.finalize()
    }
}

impl Default for Crc16Digest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    /// Bitwise reference used by the host-side viewers.
    fn reference_crc(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &byte in data {
            crc ^= u16::from(byte) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }
    }

    #[test]
    fn test_crc16_empty() {
        assert_eq!(checksum(&[]), CRC16_INIT);
    }

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_crc16_matches_bitwise_reference() {
        let data: Vec<u8> = (0..=255u8).chain(b"FRMEENDF".iter().copied()).collect();
        assert_eq!(checksum(&data), reference_crc(&data));
        assert_eq!(checksum(b"FRME"), reference_crc(b"FRME"));
    }

    #[test]
    fn test_crc16_digest_matches_batch() {
        let data = b"FRME\x00\x00\x6e\x0eENDF";
        let mut digest = Crc16Digest::new();
        for chunk in data.chunks(3) {
            digest.update(chunk);
        }
        assert_eq!(digest.finalize(), checksum(data));
    }

    #[test]
    fn test_crc16_single_bit_flips_never_collide() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        let mut data = Vec::with_capacity(4096);

        for _ in 0..10_000 {
            let len = 1 + (rng.next() % 4095) as usize;
            data.clear();
            data.extend((0..len).map(|_| rng.next() as u8));
            let original = checksum(&data);

            let bit = (rng.next() % (len as u64 * 8)) as usize;
            data[bit / 8] ^= 1 << (bit % 8);

            assert_ne!(checksum(&data), original, "collision at bit {bit} of {len}");
        }
    }
}
