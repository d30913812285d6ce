//! Field tables.
//!
//! A message type describes itself with an ordered, `const` table of [`FieldDescriptor`]s.
//! Each descriptor pairs a field number with a typed access strategy that knows how to size,
//! write and merge that one field. The decode loop looks field numbers up in the table
//! instead of switching on them, and encoding walks the table in order.
//!
//! ```rust
//! use protowire::message::field::{FieldDescriptor, Presence, Repeated, Singular};
//! use protowire::message::scalar::{Str, UInt32};
//! use protowire::Message;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     label: String,
//!     coords: Vec<u32>,
//! }
//!
//! impl Message for Point {
//!     const NAME: &'static str = "Point";
//!     const FIELDS: &'static [FieldDescriptor<Self>] = &[
//!         FieldDescriptor {
//!             number: 1,
//!             name: "label",
//!             access: &Singular::<Str, Self> {
//!                 get: |m| &m.label,
//!                 get_mut: |m| &mut m.label,
//!                 presence: Presence::Implicit,
//!             },
//!         },
//!         FieldDescriptor {
//!             number: 2,
//!             name: "coords",
//!             access: &Repeated::<UInt32, Self> {
//!                 get: |m| &m.coords,
//!                 get_mut: |m| &mut m.coords,
//!                 packed: true,
//!             },
//!         },
//!     ];
//! }
//!
//! let point = Point { label: "a".into(), coords: vec![1, 2] };
//! let bytes = point.marshal().unwrap();
//! assert_eq!(bytes, [0x0a, 0x01, b'a', 0x12, 0x02, 0x01, 0x02]);
//! assert_eq!(Point::unmarshal(&bytes).unwrap(), point);
//! ```

use crate::core::cursor::{DecodeContext, Reader, Writer};
use crate::core::varint::encoded_len_varint;
use crate::core::wire::{tag_len, WireType, MAX_FIELD_NUMBER, RESERVED_FIELD_NUMBERS};
use crate::error::Result;
use crate::message::scalar::ScalarCodec;
use crate::message::{Message, SizeCache};
use std::fmt;

/// Declared protobuf type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Bool,
    Enum,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
    Message,
}

impl FieldType {
    /// Wire type used for a single value of this type
    pub fn wire_type(self) -> WireType {
        match self {
            FieldType::Int32
            | FieldType::Int64
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Bool
            | FieldType::Enum => WireType::Varint,
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => WireType::Fixed64,
            FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => WireType::Fixed32,
            FieldType::String | FieldType::Bytes | FieldType::Message => {
                WireType::LengthDelimited
            }
        }
    }

    /// Whether repeated values of this type may share one length-delimited run
    pub fn is_packable(self) -> bool {
        !matches!(
            self,
            FieldType::String | FieldType::Bytes | FieldType::Message
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Uint32 => "uint32",
            FieldType::Uint64 => "uint64",
            FieldType::Sint32 => "sint32",
            FieldType::Sint64 => "sint64",
            FieldType::Bool => "bool",
            FieldType::Enum => "enum",
            FieldType::Fixed32 => "fixed32",
            FieldType::Fixed64 => "fixed64",
            FieldType::Sfixed32 => "sfixed32",
            FieldType::Sfixed64 => "sfixed64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Message => "message",
        }
    }
}

/// Cardinality and presence of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Written only when not the zero value
    Implicit,
    /// Written every time, zero or not
    Required,
    /// Written when set, including when set to zero
    Optional,
    /// One record per element
    Repeated,
    /// All elements in one length-delimited run
    Packed,
}

impl Label {
    pub fn is_repeated(self) -> bool {
        matches!(self, Label::Repeated | Label::Packed)
    }
}

/// Presence rule for a plain (non-`Option`) singular scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Zero values are omitted
    Implicit,
    /// Always written
    Always,
}

/// Typed read/write strategy for one field of `M`
pub trait FieldAccess<M>: 'static {
    fn field_type(&self) -> FieldType;

    fn label(&self) -> Label;

    /// Whether a value arriving with `wire_type` can be merged into this field.
    ///
    /// Repeated packable fields take both the element wire type and a packed run.
    fn accepts(&self, wire_type: WireType) -> bool {
        let field_type = self.field_type();
        wire_type == field_type.wire_type()
            || (self.label().is_repeated()
                && field_type.is_packable()
                && wire_type == WireType::LengthDelimited)
    }

    /// Bytes this field contributes to the message, tags included
    fn encoded_len(&self, msg: &M, number: u32) -> usize;

    fn encode(&self, msg: &M, number: u32, writer: &mut Writer<'_>) -> Result<()>;

    /// `encoded_len`, also recording the body length of each embedded message in `lens`
    fn encoded_len_cached(&self, msg: &M, number: u32, _lens: &mut Vec<usize>) -> usize {
        self.encoded_len(msg, number)
    }

    /// `encode`, taking embedded message lengths from a cache built by `encoded_len_cached`
    fn encode_cached(
        &self,
        msg: &M,
        number: u32,
        writer: &mut Writer<'_>,
        _lens: &mut SizeCache<'_>,
    ) -> Result<()> {
        self.encode(msg, number, writer)
    }

    fn merge(
        &self,
        msg: &mut M,
        wire_type: WireType,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<()>;
}

/// One row of a message's field table
pub struct FieldDescriptor<M: 'static> {
    pub number: u32,
    pub name: &'static str,
    pub access: &'static dyn FieldAccess<M>,
}

impl<M: 'static> FieldDescriptor<M> {
    pub fn field_type(&self) -> FieldType {
        self.access.field_type()
    }

    pub fn label(&self) -> Label {
        self.access.label()
    }

    pub fn wire_type(&self) -> WireType {
        match self.label() {
            Label::Packed => WireType::LengthDelimited,
            _ => self.field_type().wire_type(),
        }
    }
}

impl<M: 'static> fmt::Debug for FieldDescriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("type", &self.field_type().name())
            .field("label", &self.label())
            .finish()
    }
}

/// Singular scalar stored as a plain value
pub struct Singular<C: ScalarCodec, M> {
    pub get: fn(&M) -> &C::Value,
    pub get_mut: fn(&mut M) -> &mut C::Value,
    pub presence: Presence,
}

impl<C: ScalarCodec, M: 'static> Singular<C, M> {
    fn present(&self, msg: &M) -> bool {
        self.presence == Presence::Always || !C::is_default((self.get)(msg))
    }
}

impl<C: ScalarCodec, M: 'static> FieldAccess<M> for Singular<C, M> {
    fn field_type(&self) -> FieldType {
        C::FIELD_TYPE
    }

    fn label(&self) -> Label {
        match self.presence {
            Presence::Implicit => Label::Implicit,
            Presence::Always => Label::Required,
        }
    }

    fn encoded_len(&self, msg: &M, number: u32) -> usize {
        if !self.present(msg) {
            return 0;
        }
        tag_len(number) + C::encoded_len((self.get)(msg))
    }

    fn encode(&self, msg: &M, number: u32, writer: &mut Writer<'_>) -> Result<()> {
        if !self.present(msg) {
            return Ok(());
        }
        writer.put_tag(number, C::FIELD_TYPE.wire_type())?;
        C::encode((self.get)(msg), writer)
    }

    fn merge(
        &self,
        msg: &mut M,
        _wire_type: WireType,
        reader: &mut Reader<'_>,
        _ctx: DecodeContext,
    ) -> Result<()> {
        // Last value on the wire wins
        *(self.get_mut)(msg) = C::decode(reader)?;
        Ok(())
    }
}

/// Singular scalar with explicit presence
pub struct Optional<C: ScalarCodec, M> {
    pub get: fn(&M) -> &Option<C::Value>,
    pub get_mut: fn(&mut M) -> &mut Option<C::Value>,
}

impl<C: ScalarCodec, M: 'static> FieldAccess<M> for Optional<C, M> {
    fn field_type(&self) -> FieldType {
        C::FIELD_TYPE
    }

    fn label(&self) -> Label {
        Label::Optional
    }

    fn encoded_len(&self, msg: &M, number: u32) -> usize {
        (self.get)(msg)
            .as_ref()
            .map_or(0, |value| tag_len(number) + C::encoded_len(value))
    }

    fn encode(&self, msg: &M, number: u32, writer: &mut Writer<'_>) -> Result<()> {
        if let Some(value) = (self.get)(msg) {
            writer.put_tag(number, C::FIELD_TYPE.wire_type())?;
            C::encode(value, writer)?;
        }
        Ok(())
    }

    fn merge(
        &self,
        msg: &mut M,
        _wire_type: WireType,
        reader: &mut Reader<'_>,
        _ctx: DecodeContext,
    ) -> Result<()> {
        *(self.get_mut)(msg) = Some(C::decode(reader)?);
        Ok(())
    }
}

/// Repeated scalar
///
/// `packed` only chooses the encoding; decoding takes packed and unpacked input alike.
pub struct Repeated<C: ScalarCodec, M> {
    pub get: fn(&M) -> &Vec<C::Value>,
    pub get_mut: fn(&mut M) -> &mut Vec<C::Value>,
    pub packed: bool,
}

impl<C: ScalarCodec, M: 'static> Repeated<C, M> {
    fn writes_packed(&self) -> bool {
        self.packed && C::FIELD_TYPE.is_packable()
    }

    fn packed_payload_len(values: &[C::Value]) -> usize {
        values.iter().map(C::encoded_len).sum()
    }
}

impl<C: ScalarCodec, M: 'static> FieldAccess<M> for Repeated<C, M> {
    fn field_type(&self) -> FieldType {
        C::FIELD_TYPE
    }

    fn label(&self) -> Label {
        if self.writes_packed() {
            Label::Packed
        } else {
            Label::Repeated
        }
    }

    fn encoded_len(&self, msg: &M, number: u32) -> usize {
        let values = (self.get)(msg);
        if values.is_empty() {
            return 0;
        }
        if self.writes_packed() {
            let payload = Self::packed_payload_len(values);
            tag_len(number) + encoded_len_varint(payload as u64) + payload
        } else {
            let tag = tag_len(number);
            values.iter().map(|value| tag + C::encoded_len(value)).sum()
        }
    }

    fn encode(&self, msg: &M, number: u32, writer: &mut Writer<'_>) -> Result<()> {
        let values = (self.get)(msg);
        if values.is_empty() {
            return Ok(());
        }
        if self.writes_packed() {
            writer.put_tag(number, WireType::LengthDelimited)?;
            writer.put_varint(Self::packed_payload_len(values) as u64)?;
            for value in values {
                C::encode(value, writer)?;
            }
        } else {
            for value in values {
                writer.put_tag(number, C::FIELD_TYPE.wire_type())?;
                C::encode(value, writer)?;
            }
        }
        Ok(())
    }

    fn merge(
        &self,
        msg: &mut M,
        wire_type: WireType,
        reader: &mut Reader<'_>,
        _ctx: DecodeContext,
    ) -> Result<()> {
        let values = (self.get_mut)(msg);
        if wire_type == WireType::LengthDelimited && C::FIELD_TYPE.is_packable() {
            let mut run = Reader::new(reader.read_length_delimited()?);
            while !run.is_empty() {
                values.push(C::decode(&mut run)?);
            }
        } else {
            values.push(C::decode(reader)?);
        }
        Ok(())
    }
}

fn nested_len<N: Message>(value: &N, number: u32) -> usize {
    let len = value.encoded_len();
    tag_len(number) + encoded_len_varint(len as u64) + len
}

fn nested_len_cached<N: Message>(value: &N, number: u32, lens: &mut Vec<usize>) -> usize {
    let len = value.encoded_len_cached(lens);
    tag_len(number) + encoded_len_varint(len as u64) + len
}

fn write_nested<N: Message>(value: &N, number: u32, writer: &mut Writer<'_>) -> Result<()> {
    let mut lens = Vec::new();
    value.encoded_len_cached(&mut lens);
    write_nested_cached(value, number, writer, &mut lens.iter())
}

fn write_nested_cached<N: Message>(
    value: &N,
    number: u32,
    writer: &mut Writer<'_>,
    lens: &mut SizeCache<'_>,
) -> Result<()> {
    let len = match lens.next() {
        Some(len) => *len,
        None => value.encoded_len(),
    };
    writer.put_tag(number, WireType::LengthDelimited)?;
    writer.put_varint(len as u64)?;
    value.encode_cached(writer, lens)
}

fn read_nested<N: Message>(
    value: &mut N,
    reader: &mut Reader<'_>,
    ctx: DecodeContext,
) -> Result<()> {
    let payload = reader.read_length_delimited()?;
    value.merge_from(&mut Reader::new(payload), ctx.enter_recursion()?)
}

/// Singular embedded message; `None` is left off the wire
pub struct Nested<N: Message, M> {
    pub get: fn(&M) -> &Option<N>,
    pub get_mut: fn(&mut M) -> &mut Option<N>,
}

impl<N: Message, M: 'static> FieldAccess<M> for Nested<N, M> {
    fn field_type(&self) -> FieldType {
        FieldType::Message
    }

    fn label(&self) -> Label {
        Label::Optional
    }

    fn encoded_len(&self, msg: &M, number: u32) -> usize {
        (self.get)(msg)
            .as_ref()
            .map_or(0, |value| nested_len(value, number))
    }

    fn encode(&self, msg: &M, number: u32, writer: &mut Writer<'_>) -> Result<()> {
        match (self.get)(msg) {
            Some(value) => write_nested(value, number, writer),
            None => Ok(()),
        }
    }

    fn encoded_len_cached(&self, msg: &M, number: u32, lens: &mut Vec<usize>) -> usize {
        (self.get)(msg)
            .as_ref()
            .map_or(0, |value| nested_len_cached(value, number, lens))
    }

    fn encode_cached(
        &self,
        msg: &M,
        number: u32,
        writer: &mut Writer<'_>,
        lens: &mut SizeCache<'_>,
    ) -> Result<()> {
        match (self.get)(msg) {
            Some(value) => write_nested_cached(value, number, writer, lens),
            None => Ok(()),
        }
    }

    fn merge(
        &self,
        msg: &mut M,
        _wire_type: WireType,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<()> {
        // A repeated occurrence merges into the message already decoded
        let slot = (self.get_mut)(msg).get_or_insert_with(N::default);
        read_nested(slot, reader, ctx)
    }
}

/// Repeated embedded message
pub struct RepeatedMessage<N: Message, M> {
    pub get: fn(&M) -> &Vec<N>,
    pub get_mut: fn(&mut M) -> &mut Vec<N>,
}

impl<N: Message, M: 'static> FieldAccess<M> for RepeatedMessage<N, M> {
    fn field_type(&self) -> FieldType {
        FieldType::Message
    }

    fn label(&self) -> Label {
        Label::Repeated
    }

    fn encoded_len(&self, msg: &M, number: u32) -> usize {
        (self.get)(msg)
            .iter()
            .map(|value| nested_len(value, number))
            .sum()
    }

    fn encode(&self, msg: &M, number: u32, writer: &mut Writer<'_>) -> Result<()> {
        for value in (self.get)(msg) {
            write_nested(value, number, writer)?;
        }
        Ok(())
    }

    fn encoded_len_cached(&self, msg: &M, number: u32, lens: &mut Vec<usize>) -> usize {
        (self.get)(msg)
            .iter()
            .map(|value| nested_len_cached(value, number, lens))
            .sum()
    }

    fn encode_cached(
        &self,
        msg: &M,
        number: u32,
        writer: &mut Writer<'_>,
        lens: &mut SizeCache<'_>,
    ) -> Result<()> {
        for value in (self.get)(msg) {
            write_nested_cached(value, number, writer, lens)?;
        }
        Ok(())
    }

    fn merge(
        &self,
        msg: &mut M,
        _wire_type: WireType,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<()> {
        let mut value = N::default();
        read_nested(&mut value, reader, ctx)?;
        (self.get_mut)(msg).push(value);
        Ok(())
    }
}

/// Check a field table for mistakes the type system cannot catch.
///
/// Returns a list of problems. Empty list means the table is usable.
pub fn validate_fields<M: Message>() -> Vec<String> {
    let mut errors = Vec::new();
    let mut previous: Option<u32> = None;

    for field in M::FIELDS {
        if field.number == 0 || field.number > MAX_FIELD_NUMBER {
            errors.push(format!(
                "{}.{}: field number {} out of range (1..={MAX_FIELD_NUMBER})",
                M::NAME,
                field.name,
                field.number
            ));
        }
        if RESERVED_FIELD_NUMBERS.contains(&field.number) {
            errors.push(format!(
                "{}.{}: field number {} is reserved",
                M::NAME,
                field.name,
                field.number
            ));
        }
        if let Some(prev) = previous {
            if field.number == prev {
                errors.push(format!(
                    "{}.{}: duplicate field number {}",
                    M::NAME,
                    field.name,
                    field.number
                ));
            } else if field.number < prev {
                errors.push(format!(
                    "{}.{}: field number {} listed after {prev} (table must be ascending)",
                    M::NAME,
                    field.name,
                    field.number
                ));
            }
        }
        previous = Some(field.number);
    }

    errors
}
