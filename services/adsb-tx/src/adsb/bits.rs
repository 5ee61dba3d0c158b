//! Big-endian bit field access on fixed-size byte buffers
//!
//! Bit offset 0 is the most significant bit of byte 0.

/// Read `width` bits (at most 64) starting at bit `offset`
pub fn get_bits<const N: usize>(buf: &[u8; N], offset: usize, width: usize) -> u64 {
    debug_assert!(width <= 64);
    debug_assert!(offset + width <= N * 8);

    let mut value = 0u64;
    for bit in offset..offset + width {
        let set = (buf[bit / 8] >> (7 - bit % 8)) & 1;
        value = (value << 1) | set as u64;
    }
    value
}

/// Write the low `width` bits of `value` starting at bit `offset`
pub fn set_bits<const N: usize>(buf: &mut [u8; N], offset: usize, width: usize, value: u64) {
    debug_assert!(width <= 64);
    debug_assert!(offset + width <= N * 8);

    for i in 0..width {
        let bit = offset + i;
        let mask = 0x80u8 >> (bit % 8);
        if (value >> (width - 1 - i)) & 1 == 1 {
            buf[bit / 8] |= mask;
        } else {
            buf[bit / 8] &= !mask;
        }
    }
}

/// Test a single bit
pub fn bit<const N: usize>(buf: &[u8; N], offset: usize) -> bool {
    buf[offset / 8] & (0x80 >> (offset % 8)) != 0
}

/// Flip a single bit
pub fn flip_bit<const N: usize>(buf: &mut [u8; N], offset: usize) {
    buf[offset / 8] ^= 0x80 >> (offset % 8);
}
