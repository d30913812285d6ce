//! # Field Skipping
//!
//! Consumes one field whose number the current schema does not know. This is what lets an
//! older reader walk straight past fields added by a newer writer: the wire type alone says
//! how long the payload is.
//!
//! Legacy groups have no length prefix, so skipping one means walking every nested field up
//! to the matching end-group tag. The walk keeps its own stack of open groups rather than
//! recursing, and that stack is bounded by the [`DecodeContext`] depth budget.

use crate::core::cursor::{DecodeContext, Reader};
use crate::core::wire::{Tag, WireType};
use crate::error::{Result, WireError};
use tracing::trace;

/// Skip the payload of the field introduced by `tag`, which the caller has already read.
///
/// On success the reader sits on the first byte after the field.
pub fn skip_field(tag: Tag, reader: &mut Reader<'_>, ctx: DecodeContext) -> Result<()> {
    match tag.wire_type {
        WireType::Varint => {
            reader.read_varint()?;
        }
        WireType::Fixed64 => reader.advance(8)?,
        WireType::Fixed32 => reader.advance(4)?,
        WireType::LengthDelimited => {
            let len = reader.read_length()?;
            reader.advance(len)?;
        }
        WireType::StartGroup => skip_group(tag.field_number, reader, ctx.enter_recursion()?)?,
        WireType::EndGroup => return Err(WireError::UnexpectedEndGroup),
    }
    Ok(())
}

/// Skip a whole field, tag included, returning the raw bytes it occupied.
pub fn skip_tagged_field<'a>(reader: &mut Reader<'a>, ctx: DecodeContext) -> Result<&'a [u8]> {
    let start = reader.position();
    let tag = reader.read_tag()?;
    skip_field(tag, reader, ctx)?;
    Ok(reader.consumed_since(start))
}

fn skip_group(field_number: u32, reader: &mut Reader<'_>, ctx: DecodeContext) -> Result<()> {
    // Field numbers of the groups still open, innermost last
    let mut open = vec![field_number];
    while let Some(&innermost) = open.last() {
        if reader.is_empty() {
            // Input ran out before the group was closed
            return Err(WireError::UnexpectedEndOfInput);
        }
        let inner = reader.read_tag()?;
        match inner.wire_type {
            WireType::EndGroup => {
                if inner.field_number != innermost {
                    return Err(WireError::UnexpectedEndGroup);
                }
                open.pop();
                trace!(field_number = innermost, "skipped group");
            }
            WireType::StartGroup => {
                // Each group below the outermost spends one more level of the budget
                if open.len() > ctx.depth_remaining() as usize {
                    return Err(WireError::RecursionLimitExceeded);
                }
                open.push(inner.field_number);
            }
            _ => skip_field(inner, reader, ctx)?,
        }
    }
    Ok(())
}
