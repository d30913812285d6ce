//! # Stream Framing
//!
//! [`DelimitedCodec`] plugs the message codec into `tokio_util::codec::Framed`. Each record on
//! the stream is a varint byte count followed by that many bytes of encoded message:
//!
//! ```text
//! [Length(varint)] [Message(Length)] [Length(varint)] [Message(Length)] ...
//! ```
//!
//! This is the same layout `Message::marshal_length_delimited` produces, so records written
//! one way can be read the other.
//!
//! ## Limits
//! A record whose declared length exceeds `max_message_size` is rejected before any of its
//! payload is buffered.

use crate::config::DecodeConfig;
use crate::core::varint::{decode_varint, encode_varint, encoded_len_varint, MAX_VARINT_LEN};
use crate::error::{Result, WireError};
use crate::message::Message;
use crate::utils::metrics::CodecMetrics;
use bytes::{Buf, BytesMut};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

/// Length-prefixed message codec for byte streams
#[derive(Debug)]
pub struct DelimitedCodec<M> {
    config: DecodeConfig,
    metrics: Option<Arc<CodecMetrics>>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> DelimitedCodec<M> {
    pub fn new() -> Self {
        Self::with_config(DecodeConfig::default())
    }

    pub fn with_config(config: DecodeConfig) -> Self {
        Self {
            config,
            metrics: None,
            _message: PhantomData,
        }
    }

    /// Count records and bytes in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<CodecMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Parse the length prefix at the front of `src`.
    ///
    /// `Ok(None)` means the prefix itself has not fully arrived yet.
    fn peek_length(&self, src: &[u8]) -> Result<Option<(usize, usize)>> {
        let (len, prefix) = match decode_varint(src, 0) {
            Ok(decoded) => decoded,
            Err(WireError::UnexpectedEndOfInput) if src.len() < MAX_VARINT_LEN => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > self.config.max_message_size {
            return Err(WireError::MessageTooLarge(len));
        }
        Ok(Some((len, prefix)))
    }

    fn record_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.decode_error();
        }
    }
}

impl<M: Message> Default for DelimitedCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Clone for DelimitedCodec<M> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            metrics: self.metrics.clone(),
            _message: PhantomData,
        }
    }
}

impl<M: Message> Decoder for DelimitedCodec<M> {
    type Item = M;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<M>> {
        if src.is_empty() {
            return Ok(None);
        }

        let (len, prefix) = match self.peek_length(src) {
            Ok(Some(header)) => header,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, buffered = src.len(), "Rejecting stream record");
                self.record_error();
                return Err(e);
            }
        };

        let total = prefix + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(prefix);
        let frame = src.split_to(len);
        match M::unmarshal_with(&frame, &self.config) {
            Ok(msg) => {
                if let Some(metrics) = &self.metrics {
                    metrics.message_decoded(total as u64);
                }
                Ok(Some(msg))
            }
            Err(e) => {
                debug!(message = M::NAME, len, error = %e, "Stream record failed to decode");
                self.record_error();
                Err(e)
            }
        }
    }
}

impl<M: Message> Encoder<M> for DelimitedCodec<M> {
    type Error = WireError;

    fn encode(&mut self, item: M, dst: &mut BytesMut) -> Result<()> {
        let len = item.encoded_len();
        if len > self.config.max_message_size {
            if let Some(metrics) = &self.metrics {
                metrics.encode_error();
            }
            return Err(WireError::MessageTooLarge(len));
        }

        let prefix = encoded_len_varint(len as u64);
        let start = dst.len();
        dst.resize(start + prefix + len, 0);

        let written = encode_varint(len as u64, &mut dst[start..], 0)
            .and_then(|body| item.marshal_to(&mut dst[start + body..]));
        if let Err(e) = written {
            dst.truncate(start);
            if let Some(metrics) = &self.metrics {
                metrics.encode_error();
            }
            return Err(e);
        }

        if let Some(metrics) = &self.metrics {
            metrics.message_encoded((prefix + len) as u64);
        }
        Ok(())
    }
}
