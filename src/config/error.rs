//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found at an explicitly requested path.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the config file.
    #[error("failed to read configuration file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// An environment override did not parse.
    #[error("failed to parse environment variable '{var}': {message}")]
    EnvParseError { var: String, message: String },

    /// A value is out of range.
    #[error("invalid configuration value for '{key}': {message}")]
    ValidationError { key: String, message: String },
}

impl ConfigError {
    /// Create an env parse error.
    pub fn env_parse<V: Into<String>, M: Into<String>>(var: V, message: M) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
