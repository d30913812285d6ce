//! # Message Codec
//!
//! The [`Message`] trait turns a field table into Size, Marshal and Unmarshal.
//!
//! ## Encoding
//! `encoded_len` sums every present field. `marshal_to` writes into a buffer the caller sized
//! with `encoded_len` and never grows it. One size pass records the length of every embedded
//! message up front, so encoding a deep tree stays linear in its size. Fields go out in table
//! order, which is ascending field-number order, so output is deterministic.
//!
//! ## Decoding
//! ```text
//! Reading ──tag──▶ known number ──▶ typed merge ──▶ Reading
//!                  unknown number ─▶ skip       ──▶ Reading
//! Reading ──end of input──▶ Done
//! ```
//! Any malformed input ends the call with an error and the partial message is dropped.
//!
//! ## Forward Compatibility
//! Unknown fields are skipped. A message that exposes an [`UnknownFields`] store also keeps
//! their raw bytes and writes them back out after its known fields.

pub mod field;
pub mod scalar;
pub mod types;

use crate::config::DecodeConfig;
use crate::core::cursor::{DecodeContext, Reader, Writer};
use crate::core::skip::skip_field;
use crate::core::varint::{decode_varint, encode_varint, encoded_len_varint};
use crate::core::wire::{Tag, WireType};
use crate::error::{Result, WireError};
use field::FieldDescriptor;
use tracing::{debug, trace};

/// A type with a protobuf wire encoding
pub trait Message: Default + Sized + 'static {
    /// Schema name used in errors and logs
    const NAME: &'static str;

    /// Field table, sorted by ascending field number
    const FIELDS: &'static [FieldDescriptor<Self>];

    /// Store for fields this schema does not know, if the type keeps them
    fn unknown_fields(&self) -> Option<&UnknownFields> {
        None
    }

    fn unknown_fields_mut(&mut self) -> Option<&mut UnknownFields> {
        None
    }

    /// Table row for `number`
    fn descriptor(number: u32) -> Option<&'static FieldDescriptor<Self>> {
        let fields: &'static [FieldDescriptor<Self>] = Self::FIELDS;
        fields
            .binary_search_by_key(&number, |field| field.number)
            .ok()
            .map(|index| &fields[index])
    }

    /// Exact encoded size in bytes
    fn encoded_len(&self) -> usize {
        let known: usize = Self::FIELDS
            .iter()
            .map(|field| field.access.encoded_len(self, field.number))
            .sum();
        known + self.unknown_fields().map_or(0, UnknownFields::encoded_len)
    }

    /// `encoded_len`, recording this message's length and then that of every embedded
    /// message beneath it, in the order `encode_cached` reads them back
    fn encoded_len_cached(&self, lens: &mut Vec<usize>) -> usize {
        let slot = lens.len();
        lens.push(0);
        let known: usize = Self::FIELDS
            .iter()
            .map(|field| field.access.encoded_len_cached(self, field.number, lens))
            .sum();
        let total = known + self.unknown_fields().map_or(0, UnknownFields::encoded_len);
        lens[slot] = total;
        total
    }

    /// Write every field at the writer's position
    fn encode_raw(&self, writer: &mut Writer<'_>) -> Result<()> {
        let mut lens = Vec::new();
        self.encoded_len_cached(&mut lens);
        let mut lens = lens.iter();
        lens.next();
        self.encode_cached(writer, &mut lens)
    }

    /// Write every field, taking embedded message lengths from `lens` (positioned just past
    /// this message's own entry) instead of sizing each subtree again
    fn encode_cached(&self, writer: &mut Writer<'_>, lens: &mut SizeCache<'_>) -> Result<()> {
        for field in Self::FIELDS {
            field.access.encode_cached(self, field.number, writer, lens)?;
        }
        if let Some(unknown) = self.unknown_fields() {
            unknown.encode(writer)?;
        }
        Ok(())
    }

    /// Encode into `out`, which must hold at least `encoded_len()` bytes.
    ///
    /// Returns the number of bytes written. A short buffer is rejected before anything is
    /// written.
    fn marshal_to(&self, out: &mut [u8]) -> Result<usize> {
        let mut lens = Vec::new();
        let needed = self.encoded_len_cached(&mut lens);
        if out.len() < needed {
            return Err(WireError::BufferTooSmall {
                needed,
                available: out.len(),
            });
        }
        let mut writer = Writer::new(out);
        let mut lens = lens.iter();
        lens.next();
        self.encode_cached(&mut writer, &mut lens)?;
        Ok(writer.position())
    }

    /// Encode into a freshly allocated buffer of exactly `encoded_len()` bytes
    fn marshal(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.encoded_len()];
        let written = self.marshal_to(&mut buf)?;
        debug_assert_eq!(written, buf.len(), "{} size/encode disagree", Self::NAME);
        buf.truncate(written);
        Ok(buf)
    }

    /// Encode with a varint size prefix, for streams of consecutive messages
    fn marshal_length_delimited(&self) -> Result<Vec<u8>> {
        let len = self.encoded_len();
        let prefix = encoded_len_varint(len as u64);
        let mut buf = vec![0u8; prefix + len];
        let start = encode_varint(len as u64, &mut buf, 0)?;
        let written = self.marshal_to(&mut buf[start..])?;
        buf.truncate(start + written);
        Ok(buf)
    }

    /// Decode with default limits
    fn unmarshal(input: &[u8]) -> Result<Self> {
        Self::unmarshal_with(input, &DecodeConfig::default())
    }

    /// Decode with caller-supplied limits
    fn unmarshal_with(input: &[u8], config: &DecodeConfig) -> Result<Self> {
        let mut msg = Self::default();
        msg.merge_with(input, config)?;
        Ok(msg)
    }

    /// Decode one size-prefixed message from the front of `input`.
    ///
    /// Returns the message and the number of bytes consumed.
    fn unmarshal_length_delimited(input: &[u8]) -> Result<(Self, usize)> {
        let (len, start) = decode_varint(input, 0)?;
        let len = usize::try_from(len).map_err(|_| WireError::InvalidLength)?;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= input.len())
            .ok_or(WireError::InvalidLength)?;
        let msg = Self::unmarshal(&input[start..end])?;
        Ok((msg, end))
    }

    /// Decode `input` into `self`: scalars overwrite, repeated fields append
    fn merge(&mut self, input: &[u8]) -> Result<()> {
        self.merge_with(input, &DecodeConfig::default())
    }

    fn merge_with(&mut self, input: &[u8], config: &DecodeConfig) -> Result<()> {
        if input.len() > config.max_message_size {
            return Err(WireError::MessageTooLarge(input.len()));
        }
        let mut reader = Reader::new(input);
        self.merge_from(&mut reader, DecodeContext::new(config))
            .inspect_err(|e| {
                debug!(
                    message = Self::NAME,
                    offset = reader.position(),
                    error = %e,
                    "decode failed"
                );
            })
    }

    /// Decode fields until the reader is exhausted
    fn merge_from(&mut self, reader: &mut Reader<'_>, ctx: DecodeContext) -> Result<()> {
        decode_fields(self, reader, ctx)
    }
}

fn decode_fields<M: Message>(
    msg: &mut M,
    reader: &mut Reader<'_>,
    ctx: DecodeContext,
) -> Result<()> {
    while !reader.is_empty() {
        let start = reader.position();
        let tag = reader.read_tag()?;
        if tag.wire_type == WireType::EndGroup {
            return Err(WireError::UnexpectedEndGroup);
        }

        match M::descriptor(tag.field_number) {
            Some(field) => {
                if !field.access.accepts(tag.wire_type) {
                    return Err(WireError::WireTypeMismatch {
                        message: M::NAME.to_string(),
                        field: field.name.to_string(),
                        number: field.number,
                        expected: field.wire_type().as_u8(),
                        actual: tag.wire_type.as_u8(),
                    });
                }
                field.access.merge(msg, tag.wire_type, reader, ctx)?;
            }
            None => {
                skip_field(tag, reader, ctx)?;
                trace!(
                    message = M::NAME,
                    field_number = tag.field_number,
                    wire_type = %tag.wire_type,
                    "skipped unknown field"
                );
                if ctx.retain_unknown() {
                    if let Some(unknown) = msg.unknown_fields_mut() {
                        unknown.push_raw(reader.consumed_since(start));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Embedded message lengths recorded by [`Message::encoded_len_cached`], consumed in encode
/// order so each subtree is sized once per encode
pub type SizeCache<'a> = std::slice::Iter<'a, usize>;

/// Raw bytes of fields a message did not recognize, tags included, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFields {
    raw: Vec<u8>,
}

impl UnknownFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn encoded_len(&self) -> usize {
        self.raw.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Append one complete field (tag and payload) as it appeared on the wire
    pub fn push_raw(&mut self, field: &[u8]) {
        self.raw.extend_from_slice(field);
    }

    pub fn encode(&self, writer: &mut Writer<'_>) -> Result<()> {
        writer.put_slice(&self.raw)
    }

    /// Tags of the stored fields, in order
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let mut reader = Reader::new(&self.raw);
        let mut tags = Vec::new();
        while !reader.is_empty() {
            let tag = reader.read_tag()?;
            skip_field(tag, &mut reader, DecodeContext::default())?;
            tags.push(tag);
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::field::{Nested, Presence, RepeatedMessage, Singular};
    use super::scalar::{Fixed32, Str, UInt64};
    use super::*;
    use crate::config::MAX_DEPTH_CEILING;
    use std::cell::Cell;

    thread_local! {
        // Reads of `Tree::name` through its field table
        static NAME_READS: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Leaf {
        id: u64,
    }

    impl Message for Leaf {
        const NAME: &'static str = "Leaf";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor {
            number: 1,
            name: "id",
            access: &Singular::<UInt64, Self> {
                get: |m| &m.id,
                get_mut: |m| &mut m.id,
                presence: Presence::Implicit,
            },
        }];
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tree {
        name: String,
        child: Option<Box<TreeNode>>,
        leaves: Vec<Leaf>,
        checksum: u32,
        unknown: UnknownFields,
    }

    // Recursive nesting goes through a wrapper so `Tree` stays Sized
    #[derive(Debug, Default, Clone, PartialEq)]
    struct TreeNode {
        inner: Option<Tree>,
    }

    impl Message for Box<TreeNode> {
        const NAME: &'static str = "TreeNode";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor {
            number: 1,
            name: "inner",
            access: &Nested::<Tree, Self> {
                get: |m| &m.inner,
                get_mut: |m| &mut m.inner,
            },
        }];
    }

    impl Message for Tree {
        const NAME: &'static str = "Tree";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[
            FieldDescriptor {
                number: 1,
                name: "name",
                access: &Singular::<Str, Self> {
                    get: |m| {
                        NAME_READS.with(|reads| reads.set(reads.get() + 1));
                        &m.name
                    },
                    get_mut: |m| &mut m.name,
                    presence: Presence::Implicit,
                },
            },
            FieldDescriptor {
                number: 2,
                name: "child",
                access: &Nested::<Box<TreeNode>, Self> {
                    get: |m| &m.child,
                    get_mut: |m| &mut m.child,
                },
            },
            FieldDescriptor {
                number: 3,
                name: "leaves",
                access: &RepeatedMessage::<Leaf, Self> {
                    get: |m| &m.leaves,
                    get_mut: |m| &mut m.leaves,
                },
            },
            FieldDescriptor {
                number: 20,
                name: "checksum",
                access: &Singular::<Fixed32, Self> {
                    get: |m| &m.checksum,
                    get_mut: |m| &mut m.checksum,
                    presence: Presence::Implicit,
                },
            },
        ];

        fn unknown_fields(&self) -> Option<&UnknownFields> {
            Some(&self.unknown)
        }

        fn unknown_fields_mut(&mut self) -> Option<&mut UnknownFields> {
            Some(&mut self.unknown)
        }
    }

    fn chain(depth: usize) -> Tree {
        let mut tree = Tree {
            name: "leaf".to_string(),
            ..Tree::default()
        };
        for level in 0..depth {
            tree = Tree {
                name: format!("level-{level}"),
                child: Some(Box::new(TreeNode { inner: Some(tree) })),
                ..Tree::default()
            };
        }
        tree
    }

    #[test]
    fn test_descriptor_lookup() {
        assert_eq!(Tree::descriptor(3).map(|f| f.name), Some("leaves"));
        assert_eq!(Tree::descriptor(20).map(|f| f.name), Some("checksum"));
        assert!(Tree::descriptor(4).is_none());
        assert!(field::validate_fields::<Tree>().is_empty());
    }

    #[test]
    fn test_nested_roundtrip() {
        let tree = Tree {
            name: "root".to_string(),
            child: Some(Box::new(TreeNode {
                inner: Some(Tree {
                    name: "kid".to_string(),
                    leaves: vec![Leaf { id: 7 }],
                    ..Tree::default()
                }),
            })),
            leaves: vec![Leaf { id: 1 }, Leaf::default(), Leaf { id: u64::MAX }],
            checksum: 0xDEAD_BEEF,
            unknown: UnknownFields::new(),
        };
        let bytes = tree.marshal().expect("marshal");
        assert_eq!(bytes.len(), tree.encoded_len());
        assert_eq!(Tree::unmarshal(&bytes).expect("unmarshal"), tree);
    }

    #[test]
    fn test_empty_repeated_element_is_kept() {
        let tree = Tree {
            leaves: vec![Leaf::default()],
            ..Tree::default()
        };
        // An empty sub-message still costs a tag and a zero length
        assert_eq!(tree.marshal().expect("marshal"), vec![0x1A, 0x00]);
        assert_eq!(
            Tree::unmarshal(&[0x1A, 0x00]).expect("unmarshal").leaves,
            vec![Leaf::default()]
        );
    }

    #[test]
    fn test_two_byte_tag_field() {
        let tree = Tree {
            checksum: 1,
            ..Tree::default()
        };
        let bytes = tree.marshal().expect("marshal");
        // 20 << 3 | 5 = 165 -> [0xA5, 0x01]
        assert_eq!(bytes, vec![0xA5, 0x01, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(Tree::unmarshal(&bytes).expect("unmarshal"), tree);
    }

    #[test]
    fn test_marshal_to_rejects_short_buffer() {
        let tree = Tree {
            name: "abc".to_string(),
            ..Tree::default()
        };
        let mut buf = [0xEEu8; 4];
        assert!(matches!(
            tree.marshal_to(&mut buf),
            Err(WireError::BufferTooSmall {
                needed: 5,
                available: 4
            })
        ));
        // Nothing was written
        assert_eq!(buf, [0xEE; 4]);
    }

    #[test]
    fn test_marshal_to_larger_buffer_reports_written() {
        let leaf = Leaf { id: 300 };
        let mut buf = [0u8; 16];
        let written = leaf.marshal_to(&mut buf).expect("marshal");
        assert_eq!(written, 3);
        assert_eq!(&buf[..written], &[0x08, 0xAC, 0x02]);
    }

    #[test]
    fn test_unknown_fields_retained_and_reemitted() {
        // name = "x", then unknown field 9 varint 5, then unknown field 10 fixed32
        let input = [0x0A, 0x01, b'x', 0x48, 0x05, 0x55, 1, 2, 3, 4];
        let tree = Tree::unmarshal(&input).expect("unmarshal");
        assert_eq!(tree.name, "x");
        assert_eq!(tree.unknown.as_bytes(), &input[3..]);
        let tags = tree.unknown.tags().expect("tags");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].field_number, 9);
        assert_eq!(tags[1].wire_type, WireType::Fixed32);

        assert_eq!(tree.marshal().expect("marshal"), input.to_vec());
    }

    #[test]
    fn test_unknown_fields_dropped_when_disabled() {
        let input = [0x48, 0x05];
        let config = DecodeConfig {
            retain_unknown_fields: false,
            ..DecodeConfig::default()
        };
        let tree = Tree::unmarshal_with(&input, &config).expect("unmarshal");
        assert!(tree.unknown.is_empty());
    }

    #[test]
    fn test_scalar_last_write_wins() {
        let input = [0x0A, 0x01, b'a', 0x0A, 0x01, b'b'];
        assert_eq!(Tree::unmarshal(&input).expect("unmarshal").name, "b");
    }

    #[test]
    fn test_nested_occurrences_merge() {
        // child { inner { name: "a" } } then child { inner { leaves: [{id: 1}] } }
        let first = Tree {
            child: Some(Box::new(TreeNode {
                inner: Some(Tree {
                    name: "a".to_string(),
                    ..Tree::default()
                }),
            })),
            ..Tree::default()
        };
        let second = Tree {
            child: Some(Box::new(TreeNode {
                inner: Some(Tree {
                    leaves: vec![Leaf { id: 1 }],
                    ..Tree::default()
                }),
            })),
            ..Tree::default()
        };
        let mut input = first.marshal().expect("first");
        input.extend(second.marshal().expect("second"));

        let merged = Tree::unmarshal(&input).expect("unmarshal");
        let inner = merged
            .child
            .and_then(|node| node.inner)
            .expect("merged child");
        assert_eq!(inner.name, "a");
        assert_eq!(inner.leaves, vec![Leaf { id: 1 }]);
    }

    #[test]
    fn test_wire_type_mismatch() {
        // name (field 1) sent as a varint
        let err = Tree::unmarshal(&[0x08, 0x01]).expect_err("mismatch");
        match err {
            WireError::WireTypeMismatch {
                message,
                field,
                number,
                expected,
                actual,
            } => {
                assert_eq!(message, "Tree");
                assert_eq!(field, "name");
                assert_eq!(number, 1);
                assert_eq!(expected, 2);
                assert_eq!(actual, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stray_end_group() {
        assert!(matches!(
            Tree::unmarshal(&[0x0A, 0x00, 0x4C]),
            Err(WireError::UnexpectedEndGroup)
        ));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let deep = chain(40);
        let bytes = deep.marshal().expect("marshal");
        assert_eq!(Tree::unmarshal(&bytes).expect("default depth"), deep);

        let shallow = DecodeConfig {
            max_depth: 10,
            ..DecodeConfig::default()
        };
        assert!(matches!(
            Tree::unmarshal_with(&bytes, &shallow),
            Err(WireError::RecursionLimitExceeded)
        ));
    }

    #[test]
    fn test_nested_messages_at_depth_ceiling() {
        let config = DecodeConfig {
            max_depth: MAX_DEPTH_CEILING,
            ..DecodeConfig::default()
        };
        assert!(config.validate().is_empty());

        // Every `Tree` level nests two messages: the node wrapper and the tree inside it
        let levels = MAX_DEPTH_CEILING as usize / 2;
        let deepest = chain(levels);
        let bytes = deepest.marshal().expect("marshal");
        assert_eq!(
            Tree::unmarshal_with(&bytes, &config).expect("at ceiling"),
            deepest
        );

        let too_deep = chain(levels + 1).marshal().expect("marshal");
        assert!(matches!(
            Tree::unmarshal_with(&too_deep, &config),
            Err(WireError::RecursionLimitExceeded)
        ));
    }

    #[test]
    fn test_deep_encode_sizes_each_level_once() {
        let levels = 64;
        let tree = chain(levels);

        NAME_READS.with(|reads| reads.set(0));
        let bytes = tree.marshal().expect("marshal");
        let reads = NAME_READS.with(Cell::get);

        // Two size passes and one write, a couple of reads each, per node. Re-sizing every
        // subtree at each level would read the deepest names once per ancestor.
        let nodes = levels + 1;
        assert!(reads <= 8 * nodes, "{reads} reads for {nodes} nodes");
        assert_eq!(Tree::unmarshal(&bytes).expect("unmarshal"), tree);
    }

    #[test]
    fn test_encode_raw_matches_marshal() {
        let tree = chain(3);
        let bytes = tree.marshal().expect("marshal");
        let mut buf = vec![0u8; bytes.len()];
        let mut writer = Writer::new(&mut buf);
        tree.encode_raw(&mut writer).expect("encode_raw");
        assert_eq!(writer.position(), bytes.len());
        assert_eq!(buf, bytes);
    }

    #[test]
    fn test_message_size_limit() {
        let config = DecodeConfig {
            max_message_size: 2,
            ..DecodeConfig::default()
        };
        assert!(matches!(
            Tree::unmarshal_with(&[0x0A, 0x01, b'x'], &config),
            Err(WireError::MessageTooLarge(3))
        ));
    }

    #[test]
    fn test_length_delimited_stream() {
        let a = Leaf { id: 1 };
        let b = Leaf { id: 1 << 20 };
        let mut stream = a.marshal_length_delimited().expect("a");
        stream.extend(b.marshal_length_delimited().expect("b"));

        let (first, used) = Leaf::unmarshal_length_delimited(&stream).expect("first");
        assert_eq!(first, a);
        let (second, rest) = Leaf::unmarshal_length_delimited(&stream[used..]).expect("second");
        assert_eq!(second, b);
        assert_eq!(used + rest, stream.len());

        assert!(matches!(
            Leaf::unmarshal_length_delimited(&stream[..used - 1]),
            Err(WireError::InvalidLength)
        ));
    }

    #[test]
    fn test_merge_appends() {
        let mut tree = Tree {
            leaves: vec![Leaf { id: 1 }],
            ..Tree::default()
        };
        let more = Tree {
            leaves: vec![Leaf { id: 2 }],
            ..Tree::default()
        };
        tree.merge(&more.marshal().expect("marshal")).expect("merge");
        assert_eq!(tree.leaves, vec![Leaf { id: 1 }, Leaf { id: 2 }]);
    }
}
