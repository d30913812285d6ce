//! Logging setup
//!
//! The codec only emits `tracing` events; installing a subscriber is left to the application.
//! [`init_logging`] is a convenience for binaries, tests and demos that want the usual
//! console output driven by [`LoggingConfig`].
//!
//! `RUST_LOG` takes precedence over the configured level when it is set.

use crate::config::LoggingConfig;
use crate::error::{Result, WireError};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is absent or unparsable
pub fn default_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::new(config.log_level.to_string().to_lowercase())
}

/// Install a global subscriber.
///
/// Fails with `ConfigError` if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));

    let installed = if config.json_format {
        let layer = tracing_subscriber::fmt::layer().json().with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
    } else {
        let layer = tracing_subscriber::fmt::layer().with_target(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
    };
    installed.map_err(|e| WireError::ConfigError(format!("Failed to install logger: {e}")))?;

    info!(
        app = %config.app_name,
        level = %config.log_level,
        json = config.json_format,
        "Logging initialized"
    );
    Ok(())
}
