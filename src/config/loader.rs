//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{LaunchConfig, ReedbConfig, TunableOverride};
use crate::config::validation::parse_overrides;
use crate::lifecycle::error::{ErrorCode, LifecycleError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(LifecycleError),
}

impl ConfigError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorCode::InvalidPath,
            ConfigError::Io(_) | ConfigError::Parse(_) => ErrorCode::Failure,
            ConfigError::Invalid(e) => e.code(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(e) => Some(e),
        }
    }
}

/// Parse a config file's contents.
pub fn parse_config(content: &str) -> Result<LaunchConfig, ConfigError> {
    let config: ReedbConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    Ok(config.launch)
}

/// Load the launch config from a TOML file.
///
/// Only syntax is checked here; launch validation happens on initialize.
pub fn load_config(path: &Path) -> Result<LaunchConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Load a config file and parse its overrides, for reloads.
pub fn load_overrides(path: &Path) -> Result<(LaunchConfig, Vec<TunableOverride>), ConfigError> {
    let config = load_config(path)?;
    let overrides = parse_overrides(&config.overrides).map_err(ConfigError::Invalid)?;
    Ok((config, overrides))
}
