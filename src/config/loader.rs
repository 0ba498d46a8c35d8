//! Configuration loading with file resolution and environment overrides.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "SERIAL_BRIDGE";

/// Config file name looked up in the current directory.
const LOCAL_CONFIG_FILE: &str = "serial-bridge.toml";

/// Environment variable naming an explicit config path.
const CONFIG_PATH_ENV: &str = "SERIAL_BRIDGE_CONFIG";

/// Loaded configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    config: Config,
}

impl ConfigLoader {
    /// Load configuration using the standard resolution order.
    ///
    /// Priority, highest first:
    /// 1. `SERIAL_BRIDGE_CONFIG` environment variable (explicit path)
    /// 2. `./serial-bridge.toml`
    /// 3. the platform config dir (`~/.config/serial-bridge/config.toml` on
    ///    Linux, the equivalents on macOS/Windows)
    /// 4. built-in defaults (no file required)
    ///
    /// `SERIAL_BRIDGE_<SECTION>_<KEY>` environment variables override file
    /// values in every case.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match &config_path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                load_from_file(path)?
            }
            None => Config::default(),
        };

        apply_env_overrides(&mut config, std::env::vars())?;
        config.validate()?;
        Ok(Self { config_path, config })
    }

    /// Load configuration from an explicit file path.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config, std::env::vars())?;
        config.validate()?;
        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// A loader carrying the built-in defaults, env overrides applied.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        let _ = apply_env_overrides(&mut config, std::env::vars());
        Self {
            config_path: None,
            config,
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The file the configuration came from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using the standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    if let Some(dirs) = ProjectDirs::from("", "", "serial-bridge") {
        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            return Some(path);
        }
    }

    None
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply `SERIAL_BRIDGE_<SECTION>_<KEY>` overrides from an explicit variable
/// set, so tests can exercise this without touching the process environment.
fn apply_env_overrides(
    config: &mut Config,
    vars: impl IntoIterator<Item = (String, String)>,
) -> ConfigResult<()> {
    for (key, value) in vars {
        match key.strip_prefix(ENV_PREFIX).and_then(|k| k.strip_prefix('_')) {
            Some("SERIAL_DEFAULT_BAUD") => {
                config.serial.default_baud = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key.clone(), "invalid baud rate"))?;
            }
            Some("SERIAL_DEFAULT_TIMEOUT_MS") => {
                config.serial.default_timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key.clone(), "invalid timeout"))?;
            }
            Some("SERIAL_DEFAULT_READ_MAX") => {
                config.serial.default_read_max = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key.clone(), "invalid read size"))?;
            }
            Some("LOGGING_LEVEL") => {
                config.logging.level = value;
            }
            _ => {}
        }
    }
    Ok(())
}
