//! # Utility Modules
//!
//! Supporting pieces that sit beside the codec rather than inside it.
//!
//! ## Components
//! - **Logging**: Structured logging setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: Thread-safe counters for framed streams

pub mod logging;
pub mod metrics;

pub use metrics::{CodecMetrics, MetricsSnapshot};
