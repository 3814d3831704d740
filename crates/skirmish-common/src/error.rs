//! Error types shared across Skirmish crates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was read but is out of its legal range.
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
