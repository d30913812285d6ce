//! # Configuration Management
//!
//! Centralized configuration for the wire codec.
//!
//! The codec itself is stateless; configuration only bounds how much work a single decode may
//! do and how the optional logging subscriber is set up.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Security Considerations
//! - The default nesting limit (100) keeps adversarial group/message nesting off the stack
//! - The default message size cap (64 MB) bounds allocation for length-delimited records

use crate::error::{Result, WireError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default nesting budget for sub-messages and groups
pub const DEFAULT_MAX_DEPTH: u32 = 100;

/// Max accepted encoded message size (64 MB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Hard ceiling for a configured nesting budget.
///
/// Embedded messages are decoded recursively, so this keeps the deepest accepted input well
/// inside a 2 MiB thread stack, debug builds included. Larger budgets are clamped on decode.
pub const MAX_DEPTH_CEILING: u32 = 256;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CodecConfig {
    /// Decode limits
    #[serde(default)]
    pub decode: DecodeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| WireError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| WireError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| WireError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(depth) = std::env::var("PROTOWIRE_MAX_DEPTH") {
            config.decode.max_depth = depth.parse::<u32>().map_err(|e| {
                WireError::ConfigError(format!("Invalid PROTOWIRE_MAX_DEPTH '{depth}': {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("PROTOWIRE_MAX_MESSAGE_SIZE") {
            config.decode.max_message_size = size.parse::<usize>().map_err(|e| {
                WireError::ConfigError(format!("Invalid PROTOWIRE_MAX_MESSAGE_SIZE '{size}': {e}"))
            })?;
        }

        if let Ok(retain) = std::env::var("PROTOWIRE_RETAIN_UNKNOWN_FIELDS") {
            config.decode.retain_unknown_fields = retain.parse::<bool>().map_err(|e| {
                WireError::ConfigError(format!(
                    "Invalid PROTOWIRE_RETAIN_UNKNOWN_FIELDS '{retain}': {e}"
                ))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WireError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| WireError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.decode.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WireError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Limits applied to a single decode call
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DecodeConfig {
    /// Maximum combined nesting of sub-messages and groups
    pub max_depth: u32,

    /// Largest encoded message accepted, in bytes
    pub max_message_size: usize,

    /// Keep the raw bytes of unknown fields on messages that have a store for them
    pub retain_unknown_fields: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_message_size: MAX_MESSAGE_SIZE,
            retain_unknown_fields: true,
        }
    }
}

impl DecodeConfig {
    /// Validate decode limits
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_depth == 0 {
            errors.push("Max depth must be greater than 0".to_string());
        } else if self.max_depth > MAX_DEPTH_CEILING {
            errors.push(format!(
                "Max depth too large: {} (maximum: {MAX_DEPTH_CEILING})",
                self.max_depth
            ));
        }

        if self.max_message_size == 0 {
            errors.push("Max message size cannot be 0".to_string());
        } else if self.max_message_size > i32::MAX as usize {
            errors.push(format!(
                "Max message size too large: {} bytes (lengths are 31-bit on the wire)",
                self.max_message_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("protowire"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
