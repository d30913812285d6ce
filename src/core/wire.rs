//! # Wire Types and Tags
//!
//! Every field on the wire starts with a tag: a varint holding the field number in its upper
//! bits and a 3-bit wire type that says how the payload is framed.
//!
//! ```text
//! tag = (field_number << 3) | wire_type
//! ```

use crate::core::varint::encoded_len_varint;
use crate::error::{Result, WireError};
use std::fmt;

/// Smallest legal field number
pub const MIN_FIELD_NUMBER: u32 = 1;

/// Largest legal field number (29 bits)
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Field numbers reserved by the protobuf implementation
pub const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<u32> = 19_000..=19_999;

/// Payload framing of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    /// Deprecated group opener
    StartGroup = 3,
    /// Deprecated group closer
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    /// Numeric value as it appears in the low three tag bits
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(WireError::InvalidWireType(other)),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::LengthDelimited => "length-delimited",
            WireType::StartGroup => "start-group",
            WireType::EndGroup => "end-group",
            WireType::Fixed32 => "fixed32",
        };
        f.write_str(name)
    }
}

/// A decoded field key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub field_number: u32,
    pub wire_type: WireType,
}

impl Tag {
    pub fn new(field_number: u32, wire_type: WireType) -> Self {
        Self {
            field_number,
            wire_type,
        }
    }

    /// Raw varint value of this tag
    #[inline]
    pub fn to_raw(self) -> u64 {
        encode_tag(self.field_number, self.wire_type)
    }
}

/// Combine a field number and wire type into the raw tag value.
#[inline]
pub fn encode_tag(field_number: u32, wire_type: WireType) -> u64 {
    debug_assert!((MIN_FIELD_NUMBER..=MAX_FIELD_NUMBER).contains(&field_number));
    (u64::from(field_number) << 3) | u64::from(wire_type.as_u8())
}

/// Split a raw tag value into field number and wire type.
pub fn decode_tag(raw: u64) -> Result<Tag> {
    let field_number = raw >> 3;
    if field_number < u64::from(MIN_FIELD_NUMBER) || field_number > u64::from(MAX_FIELD_NUMBER) {
        return Err(WireError::InvalidTag {
            tag: raw,
            field_number,
        });
    }
    let wire_type = WireType::try_from((raw & 0x7) as u8)?;
    Ok(Tag::new(field_number as u32, wire_type))
}

/// Encoded size of a tag for `field_number`; numbers above 15 take two or more bytes.
#[inline]
pub fn tag_len(field_number: u32) -> usize {
    encoded_len_varint(u64::from(field_number) << 3)
}
