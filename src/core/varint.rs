//! # Varints
//!
//! Base-128 variable-length integers: seven value bits per byte, least significant group
//! first, high bit set on every byte except the last.
//!
//! ```text
//! 300 = 0b1_0010_1100  ->  [1010_1100] [0000_0010]
//!                            ^ more      ^ last
//! ```
//!
//! Signed values that are expected to be small in magnitude go through the zigzag mapping
//! first so that `-1` costs one byte instead of ten.

use crate::error::{Result, WireError};

/// Longest encoding of a 64-bit value
pub const MAX_VARINT_LEN: usize = 10;

/// Number of bytes `value` occupies as a varint.
#[inline]
pub fn encoded_len_varint(value: u64) -> usize {
    // Every 7 significant bits need one byte, and 0 still needs one.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Number of bytes a zigzag-mapped signed value occupies.
#[inline]
pub fn encoded_len_zigzag64(value: i64) -> usize {
    encoded_len_varint(zigzag_encode64(value))
}

/// Write `value` into `out` starting at `offset`, returning the offset past the last byte.
pub fn encode_varint(mut value: u64, out: &mut [u8], offset: usize) -> Result<usize> {
    let needed = encoded_len_varint(value);
    let end = offset.checked_add(needed).ok_or(WireError::BufferTooSmall {
        needed,
        available: 0,
    })?;
    if end > out.len() {
        return Err(WireError::BufferTooSmall {
            needed,
            available: out.len().saturating_sub(offset),
        });
    }

    let mut pos = offset;
    while value >= 0x80 {
        out[pos] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        pos += 1;
    }
    out[pos] = value as u8;
    Ok(pos + 1)
}

/// Read one varint from `input` at `offset`.
///
/// Returns the value and the offset just past it. The tenth byte may only carry the single
/// remaining bit of a 64-bit value; anything longer or wider is `IntegerOverflow`.
pub fn decode_varint(input: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut pos = offset;

    for i in 0..MAX_VARINT_LEN {
        let byte = *input.get(pos).ok_or(WireError::UnexpectedEndOfInput)?;
        pos += 1;

        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(WireError::IntegerOverflow);
        }

        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte < 0x80 {
            return Ok((value, pos));
        }
    }

    Err(WireError::IntegerOverflow)
}

/// Map a signed 64-bit value onto an unsigned one, interleaving negatives.
#[inline]
pub fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode64`].
#[inline]
pub fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// 32-bit zigzag, used by `sint32` fields.
#[inline]
pub fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`].
#[inline]
pub fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}
