//! # Wire Primitives
//!
//! Low-level building blocks of the encoding. Nothing here knows about message schemas.
//!
//! ## Components
//! - **Varint**: base-128 integers and zigzag mapping
//! - **Wire**: field tags and the six wire types
//! - **Cursor**: bounds-checked read and write cursors plus per-call decode limits
//! - **Skip**: skipping unknown fields, including nested groups
//! - **Codec**: Tokio codec for length-prefixed messages over byte streams
//!
//! ## Wire Format
//! ```text
//! [Tag(varint)] [Payload] [Tag(varint)] [Payload] ...
//! Tag = field_number << 3 | wire_type
//! ```
//!
//! ## Security
//! - Every read is bounds-checked against the input
//! - Lengths are validated before any slice is taken
//! - Group nesting is bounded by the decode depth budget

pub mod codec;
pub mod cursor;
pub mod skip;
pub mod varint;
pub mod wire;
