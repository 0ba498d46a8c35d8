//! TOML-based configuration with environment variable overrides.
//!
//! Resolution order: `SERIAL_BRIDGE_CONFIG` (explicit path), then
//! `./serial-bridge.toml`, then the platform config directory, then built-in
//! defaults. Any value can be overridden with
//! `SERIAL_BRIDGE_<SECTION>_<KEY>` variables, e.g.
//! `SERIAL_BRIDGE_SERIAL_DEFAULT_BAUD=115200`.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
