//! # Cursors
//!
//! [`Reader`] walks an immutable input slice; [`Writer`] fills a caller-sized output slice.
//! Both only move forward and check bounds before every access, so a malformed or truncated
//! input produces an error instead of a panic or an out-of-bounds read.
//!
//! [`DecodeContext`] carries the per-call limits through nested decodes.

use crate::config::{DecodeConfig, MAX_DEPTH_CEILING};
use crate::core::varint::{decode_varint, encode_varint};
use crate::core::wire::{decode_tag, encode_tag, Tag, WireType};
use crate::error::{Result, WireError};

/// Read cursor over an encoded message
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset into the input
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Bytes consumed since `start` (a value previously returned by `position`)
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.buf[start.min(self.pos)..self.pos]
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, next) = decode_varint(self.buf, self.pos)?;
        self.pos = next;
        Ok(value)
    }

    pub fn read_tag(&mut self) -> Result<Tag> {
        let raw = self.read_varint()?;
        decode_tag(raw)
    }

    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.read_exact(4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(word))
    }

    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.read_exact(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(word))
    }

    /// Read a varint length and validate it against the remaining input.
    ///
    /// Lengths that are negative when viewed as a signed 64-bit value, or that run past the
    /// end of the input, are `InvalidLength`.
    pub fn read_length(&mut self) -> Result<usize> {
        let raw = self.read_varint()?;
        if (raw as i64) < 0 {
            return Err(WireError::InvalidLength);
        }
        let len = usize::try_from(raw).map_err(|_| WireError::InvalidLength)?;
        if len > self.remaining() {
            return Err(WireError::InvalidLength);
        }
        Ok(len)
    }

    /// Read a length prefix and return the payload it frames.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.read_exact(len)
    }

    /// Take exactly `len` bytes.
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(WireError::UnexpectedEndOfInput);
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    /// Move past `len` bytes without looking at them.
    pub fn advance(&mut self, len: usize) -> Result<()> {
        self.read_exact(len).map(|_| ())
    }
}

/// Write cursor over a caller-sized output buffer
///
/// The writer never grows its buffer. Callers size it with `encoded_len` first; every write
/// is still bounds-checked and reports `BufferTooSmall` instead of panicking.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Free space left in the buffer
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn put_varint(&mut self, value: u64) -> Result<()> {
        self.pos = encode_varint(value, self.buf, self.pos)?;
        Ok(())
    }

    pub fn put_tag(&mut self, field_number: u32, wire_type: WireType) -> Result<()> {
        self.put_varint(encode_tag(field_number, wire_type))
    }

    pub fn put_fixed32(&mut self, value: u32) -> Result<()> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_fixed64(&mut self, value: u64) -> Result<()> {
        self.put_slice(&value.to_le_bytes())
    }

    /// Length prefix followed by the bytes themselves
    pub fn put_length_delimited(&mut self, bytes: &[u8]) -> Result<()> {
        self.put_varint(bytes.len() as u64)?;
        self.put_slice(bytes)
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(WireError::BufferTooSmall {
                needed: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}

/// Per-call decode limits, threaded through nested decodes by value
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    depth_remaining: u32,
    retain_unknown: bool,
}

impl DecodeContext {
    /// Budgets above [`MAX_DEPTH_CEILING`] are clamped to it.
    pub fn new(config: &DecodeConfig) -> Self {
        Self {
            depth_remaining: config.max_depth.min(MAX_DEPTH_CEILING),
            retain_unknown: config.retain_unknown_fields,
        }
    }

    /// Context for one level deeper, or `RecursionLimitExceeded` when the budget is spent.
    pub fn enter_recursion(&self) -> Result<Self> {
        if self.depth_remaining == 0 {
            return Err(WireError::RecursionLimitExceeded);
        }
        Ok(Self {
            depth_remaining: self.depth_remaining - 1,
            ..*self
        })
    }

    /// Nesting levels still available
    pub fn depth_remaining(&self) -> u32 {
        self.depth_remaining
    }

    pub fn retain_unknown(&self) -> bool {
        self.retain_unknown
    }
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new(&DecodeConfig::default())
    }
}
