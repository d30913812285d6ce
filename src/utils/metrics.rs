//! Codec Metrics
//!
//! Counters for stream encode/decode activity.
//!
//! Uses atomic counters so one collector can be shared by every codec instance on a runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for framed message streams
#[derive(Debug)]
pub struct CodecMetrics {
    /// Records written
    pub messages_encoded: AtomicU64,
    /// Records read
    pub messages_decoded: AtomicU64,
    /// Bytes written, length prefixes included
    pub bytes_encoded: AtomicU64,
    /// Bytes read, length prefixes included
    pub bytes_decoded: AtomicU64,
    /// Records that could not be written
    pub encode_errors: AtomicU64,
    /// Records rejected or malformed
    pub decode_errors: AtomicU64,
    start_time: Instant,
}

impl CodecMetrics {
    pub fn new() -> Self {
        Self {
            messages_encoded: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a message written
    pub fn message_encoded(&self, byte_count: u64) {
        self.messages_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a message read
    pub fn message_decoded(&self, byte_count: u64) {
        self.messages_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_encoded: self.messages_encoded.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            messages_encoded = snapshot.messages_encoded,
            messages_decoded = snapshot.messages_decoded,
            bytes_encoded = snapshot.bytes_encoded,
            bytes_decoded = snapshot.bytes_decoded,
            encode_errors = snapshot.encode_errors,
            decode_errors = snapshot.decode_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for CodecMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_encoded: u64,
    pub messages_decoded: u64,
    pub bytes_encoded: u64,
    pub bytes_decoded: u64,
    pub encode_errors: u64,
    pub decode_errors: u64,
    pub uptime_seconds: u64,
}
