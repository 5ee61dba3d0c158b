//! CRC-24 parity for Mode S extended squitter frames

use super::bits::{bit, flip_bit};
use super::types::{Frame, DATA_BITS, FRAME_BITS, FRAME_LEN};

/// Mode S generator polynomial, stored with its highest-degree term in bit 0.
///
/// Bit `s` is XORed `s` positions after the leading bit being cleared. Read
/// MSB-first the same polynomial is the familiar 0x1FFF409.
pub const GENERATOR: u32 = 0x1205FFF;

/// Number of terms in the generator (degree 24)
const GENERATOR_TERMS: usize = 25;

/// MSB-first form of [`GENERATOR`] without its leading term, for the byte-wise check
const CRC24_POLY: u32 = 0x1FFF409;

/// Remainder of the first 88 bits of `frame` (followed by 24 zero bits)
/// divided by the generator.
///
/// Bits 88-111 of the input are ignored.
pub fn remainder(frame: &[u8; FRAME_LEN]) -> u32 {
    let mut work = [0u8; FRAME_LEN];
    work[..DATA_BITS / 8].copy_from_slice(&frame[..DATA_BITS / 8]);

    for pos in 0..DATA_BITS {
        if !bit(&work, pos) {
            continue;
        }
        for s in 0..GENERATOR_TERMS {
            if (GENERATOR >> s) & 1 == 1 {
                flip_bit(&mut work, pos + s);
            }
        }
    }

    debug_assert!(work[..DATA_BITS / 8].iter().all(|&b| b == 0));

    ((work[11] as u32) << 16) | ((work[12] as u32) << 8) | work[13] as u32
}

/// Compute CRC-24 checksum over message bytes
pub fn compute_crc24(msg: &[u8], bits: usize) -> u32 {
    let bytes = bits / 8;
    let mut crc: u32 = 0;

    for &b in &msg[..bytes] {
        crc ^= (b as u32) << 16;

        for _ in 0..8 {
            if crc & 0x800000 != 0 {
                crc = (crc << 1) ^ CRC24_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc & 0xFFFFFF
}

/// Whether a receiver would accept `frame`: the CRC over all 112 bits is zero
pub fn verify_checksum(frame: &Frame) -> bool {
    compute_crc24(frame.as_bytes(), FRAME_BITS) == 0
}
