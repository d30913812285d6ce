//! # protowire
//!
//! A Protocol Buffers compatible binary wire codec.
//!
//! Messages are sequences of `(tag, payload)` records. The tag carries a field number and a
//! wire type, and the wire type alone says how long the payload is. That is what lets a
//! reader skip fields it has never heard of, so old and new schemas interoperate.
//!
//! ## Layers
//! - [`core::varint`]: base-128 varints and zigzag mapping
//! - [`core::wire`]: tag packing and the six wire types
//! - [`core::skip`]: skipping unknown fields, groups included, with a depth bound
//! - [`message`]: the [`Message`] trait, which derives Size, Marshal and Unmarshal from a
//!   per-type field table
//! - [`core::codec`]: a `tokio_util` codec for streams of length-prefixed messages
//!
//! ## Example
//! ```rust
//! use protowire::message::types::HttpRequest;
//! use protowire::Message;
//!
//! let request = HttpRequest {
//!     method: "GET".into(),
//!     url: "/x".into(),
//!     headers: Vec::new(),
//!     body: vec![0x01, 0x02],
//! };
//!
//! let bytes = request.marshal()?;
//! assert_eq!(
//!     bytes,
//!     [0x0a, 0x03, 0x47, 0x45, 0x54, 0x12, 0x02, 0x2f, 0x78, 0x22, 0x02, 0x01, 0x02]
//! );
//! assert_eq!(HttpRequest::unmarshal(&bytes)?, request);
//! # Ok::<(), protowire::WireError>(())
//! ```
//!
//! ## Safety
//! - No `unsafe`; every read is bounds-checked
//! - Encoding never grows the output buffer it was given
//! - Decoding is bounded in nesting depth and message size by [`config::DecodeConfig`]

#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod message;
pub mod utils;

pub use crate::config::{CodecConfig, DecodeConfig};
pub use crate::core::codec::DelimitedCodec;
pub use crate::core::cursor::{DecodeContext, Reader, Writer};
pub use crate::core::wire::{Tag, WireType};
pub use crate::error::{Result, WireError};
pub use crate::message::field::FieldDescriptor;
pub use crate::message::{Message, UnknownFields};
