//! Configuration schema.
//!
//! Every section falls back to its defaults, so an empty or missing file is
//! a valid configuration.

use crate::port::PortConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial port defaults.
    pub serial: SerialConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Check cross-field invariants after loading and overrides.
    pub fn validate(&self) -> super::ConfigResult<()> {
        if self.serial.default_baud == 0 {
            return Err(super::ConfigError::validation(
                "serial.default_baud",
                "must be positive",
            ));
        }
        if self.serial.default_read_max == 0 {
            return Err(super::ConfigError::validation(
                "serial.default_read_max",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Serial defaults applied when the caller does not specify a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate used when none is given.
    pub default_baud: u32,
    /// Read deadline in milliseconds used when none is given.
    pub default_timeout_ms: u64,
    /// Read size cap used by the CLI when none is given.
    pub default_read_max: usize,
    /// Friendly names for device paths, e.g. `probe = "/dev/ttyUSB0"`.
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud: 9600,
            default_timeout_ms: 500,
            default_read_max: 1024,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// The default read deadline as a Duration.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Resolve a port name through the alias table.
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// A line configuration seeded from these defaults.
    pub fn port_config(&self) -> PortConfig {
        PortConfig {
            baud_rate: self.default_baud,
            timeout: self.default_timeout(),
            ..PortConfig::default()
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset: "trace" through "error".
    pub level: String,
    /// Output shape.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

/// Log output shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One event per line with full metadata.
    Full,
    /// Abbreviated single-line events.
    Compact,
}
