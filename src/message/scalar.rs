//! Scalar value codecs.
//!
//! Each marker type ties a protobuf scalar type to the Rust type that stores it and to the
//! way its payload is written. Field strategies in [`crate::message::field`] are generic over
//! these markers, so `int32` and `sint32` can both store an `i32` yet encode differently.

use crate::core::cursor::{Reader, Writer};
use crate::core::varint::{
    encoded_len_varint, zigzag_decode32, zigzag_decode64, zigzag_encode32, zigzag_encode64,
};
use crate::error::{Result, WireError};
use crate::message::field::FieldType;
use std::fmt::Debug;

/// Encoding of one scalar protobuf type
pub trait ScalarCodec: 'static {
    /// Rust storage type
    type Value: Clone + Default + PartialEq + Debug + 'static;

    const FIELD_TYPE: FieldType;

    /// Payload size, tag excluded
    fn encoded_len(value: &Self::Value) -> usize;

    fn encode(value: &Self::Value, writer: &mut Writer<'_>) -> Result<()>;

    fn decode(reader: &mut Reader<'_>) -> Result<Self::Value>;

    /// Zero values are left off the wire for implicit-presence fields
    fn is_default(value: &Self::Value) -> bool;
}

macro_rules! varint_scalar {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $field_type:ident,
     to_wire: |$v:ident| $to:expr, from_wire: |$raw:ident| $from:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl ScalarCodec for $name {
            type Value = $ty;

            const FIELD_TYPE: FieldType = FieldType::$field_type;

            #[inline]
            fn encoded_len($v: &$ty) -> usize {
                encoded_len_varint($to)
            }

            #[inline]
            fn encode($v: &$ty, writer: &mut Writer<'_>) -> Result<()> {
                writer.put_varint($to)
            }

            #[inline]
            fn decode(reader: &mut Reader<'_>) -> Result<$ty> {
                let $raw = reader.read_varint()?;
                Ok($from)
            }

            #[inline]
            fn is_default($v: &$ty) -> bool {
                $to == 0
            }
        }
    };
}

macro_rules! fixed_scalar {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $field_type:ident, $width:expr, $put:ident, $read:ident,
     to_wire: |$v:ident| $to:expr, from_wire: |$raw:ident| $from:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl ScalarCodec for $name {
            type Value = $ty;

            const FIELD_TYPE: FieldType = FieldType::$field_type;

            #[inline]
            fn encoded_len(_: &$ty) -> usize {
                $width
            }

            #[inline]
            fn encode($v: &$ty, writer: &mut Writer<'_>) -> Result<()> {
                writer.$put($to)
            }

            #[inline]
            fn decode(reader: &mut Reader<'_>) -> Result<$ty> {
                let $raw = reader.$read()?;
                Ok($from)
            }

            // Bitwise zero, so a float -0.0 is still written
            #[inline]
            fn is_default($v: &$ty) -> bool {
                $to == 0
            }
        }
    };
}

varint_scalar!(
    /// `int32`: negatives are sign-extended to 64 bits and always take ten bytes
    Int32, i32, Int32,
    to_wire: |v| *v as i64 as u64,
    from_wire: |raw| raw as i32
);
varint_scalar!(
    /// `int64`
    Int64, i64, Int64,
    to_wire: |v| *v as u64,
    from_wire: |raw| raw as i64
);
varint_scalar!(
    /// `uint32`
    UInt32, u32, Uint32,
    to_wire: |v| u64::from(*v),
    from_wire: |raw| raw as u32
);
varint_scalar!(
    /// `uint64`
    UInt64, u64, Uint64,
    to_wire: |v| *v,
    from_wire: |raw| raw
);
varint_scalar!(
    /// `sint32`: zigzag encoded
    SInt32, i32, Sint32,
    to_wire: |v| u64::from(zigzag_encode32(*v)),
    from_wire: |raw| zigzag_decode32(raw as u32)
);
varint_scalar!(
    /// `sint64`: zigzag encoded
    SInt64, i64, Sint64,
    to_wire: |v| zigzag_encode64(*v),
    from_wire: |raw| zigzag_decode64(raw)
);
varint_scalar!(
    /// `bool`: any non-zero varint decodes as true
    Bool, bool, Bool,
    to_wire: |v| u64::from(*v),
    from_wire: |raw| raw != 0
);
varint_scalar!(
    /// Open enum stored as its numeric value
    Enum, i32, Enum,
    to_wire: |v| *v as i64 as u64,
    from_wire: |raw| raw as i32
);

fixed_scalar!(
    /// `fixed32`
    Fixed32, u32, Fixed32, 4, put_fixed32, read_fixed32,
    to_wire: |v| *v,
    from_wire: |raw| raw
);
fixed_scalar!(
    /// `sfixed32`
    SFixed32, i32, Sfixed32, 4, put_fixed32, read_fixed32,
    to_wire: |v| *v as u32,
    from_wire: |raw| raw as i32
);
fixed_scalar!(
    /// `float`
    Float, f32, Float, 4, put_fixed32, read_fixed32,
    to_wire: |v| v.to_bits(),
    from_wire: |raw| f32::from_bits(raw)
);
fixed_scalar!(
    /// `fixed64`
    Fixed64, u64, Fixed64, 8, put_fixed64, read_fixed64,
    to_wire: |v| *v,
    from_wire: |raw| raw
);
fixed_scalar!(
    /// `sfixed64`
    SFixed64, i64, Sfixed64, 8, put_fixed64, read_fixed64,
    to_wire: |v| *v as u64,
    from_wire: |raw| raw as i64
);
fixed_scalar!(
    /// `double`
    Double, f64, Double, 8, put_fixed64, read_fixed64,
    to_wire: |v| v.to_bits(),
    from_wire: |raw| f64::from_bits(raw)
);

/// `string`: UTF-8 checked on decode
#[derive(Debug, Clone, Copy)]
pub struct Str;

impl ScalarCodec for Str {
    type Value = String;

    const FIELD_TYPE: FieldType = FieldType::String;

    fn encoded_len(value: &String) -> usize {
        encoded_len_varint(value.len() as u64) + value.len()
    }

    fn encode(value: &String, writer: &mut Writer<'_>) -> Result<()> {
        writer.put_length_delimited(value.as_bytes())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<String> {
        let bytes = reader.read_length_delimited()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    fn is_default(value: &String) -> bool {
        value.is_empty()
    }
}

/// `bytes`
#[derive(Debug, Clone, Copy)]
pub struct Bytes;

impl ScalarCodec for Bytes {
    type Value = Vec<u8>;

    const FIELD_TYPE: FieldType = FieldType::Bytes;

    fn encoded_len(value: &Vec<u8>) -> usize {
        encoded_len_varint(value.len() as u64) + value.len()
    }

    fn encode(value: &Vec<u8>, writer: &mut Writer<'_>) -> Result<()> {
        writer.put_length_delimited(value)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Vec<u8>> {
        reader.read_length_delimited().map(<[u8]>::to_vec)
    }

    fn is_default(value: &Vec<u8>) -> bool {
        value.is_empty()
    }
}
