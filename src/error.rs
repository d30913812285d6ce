//! # Error Types
//!
//! Error handling for the wire codec.
//!
//! Every failure the codec can report lives in [`WireError`]. Decode errors are terminal for
//! the call that produced them: the partially decoded message is dropped and never handed back.
//!
//! ## Error Categories
//! - **Input exhaustion**: the cursor needed bytes past the end of the input
//! - **Malformed encoding**: overlong varints, bad lengths, bad tags, broken group nesting
//! - **Schema disagreement**: a known field number arriving with the wrong wire type
//! - **Resource limits**: nesting depth and message size caps from [`crate::config`]
//! - **Encode preconditions**: output buffers smaller than the computed size
//!
//! Unknown fields are never errors.
//!
//! ## Example Usage
//! ```rust
//! use protowire::error::{Result, WireError};
//! use protowire::core::varint::decode_varint;
//! use tracing::{error, info};
//!
//! fn first_value(input: &[u8]) -> Result<u64> {
//!     let (value, _) = decode_varint(input, 0)?;
//!     Ok(value)
//! }
//!
//! fn main() {
//!     match first_value(&[0x80]) {
//!         Ok(value) => info!(value, "Decoded varint"),
//!         Err(e) => error!(error = %e, "Error decoding varint"),
//!     }
//!     assert!(matches!(first_value(&[0x80]), Err(WireError::UnexpectedEndOfInput)));
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// WireError is the error type for all codec operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum WireError {
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("negative or out-of-range length found during unmarshaling")]
    InvalidLength,

    #[error("illegal tag {tag} (field number {field_number})")]
    InvalidTag { tag: u64, field_number: u64 },

    #[error("illegal wire type {0}")]
    InvalidWireType(u8),

    #[error("end group tag without matching start group")]
    UnexpectedEndGroup,

    #[error("{message}: wrong wire type {actual} for field {field} ({number}), expected {expected}")]
    WireTypeMismatch {
        message: String,
        field: String,
        number: u32,
        expected: u8,
        actual: u8,
    },

    #[error("recursion limit reached")]
    RecursionLimitExceeded,

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),
}

impl WireError {
    /// True for errors caused by the input ending before a value was complete.
    ///
    /// A truncated but otherwise valid encoding fails with one of these.
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            WireError::UnexpectedEndOfInput | WireError::InvalidLength
        )
    }
}

/// Type alias for Results using WireError
pub type Result<T> = std::result::Result<T, WireError>;
