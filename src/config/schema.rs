//! Configuration schema definitions.
//!
//! This module defines the launch request for a Reedb instance and the tunables
//! that may change while it runs. All types derive Serde traits for
//! deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::error::LifecycleError;

/// Smallest accepted minimum password length.
pub const MIN_PASSLENGTH: u32 = 4;

/// Default debounce timeout before an idle vault is uncached.
pub const DEFAULT_GLOBAL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Operating system the instance runs on.
///
/// Must be supplied by the caller; detection from the build target is
/// deliberately not attempted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux = 0xE1,
    #[serde(alias = "osx")]
    MacOs = 0xE2,
    Windows = 0xE3,
    Android = 0xE4,
    Ios = 0xE5,
    Bsd = 0xE6,
}

impl OperatingSystem {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Mobile platforms keep data inside an app container and have no default
    /// operational path.
    pub fn is_mobile(self) -> bool {
        matches!(self, OperatingSystem::Android | OperatingSystem::Ios)
    }
}

impl TryFrom<u8> for OperatingSystem {
    type Error = LifecycleError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0xE1 => Ok(OperatingSystem::Linux),
            0xE2 => Ok(OperatingSystem::MacOs),
            0xE3 => Ok(OperatingSystem::Windows),
            0xE4 => Ok(OperatingSystem::Android),
            0xE5 => Ok(OperatingSystem::Ios),
            0xE6 => Ok(OperatingSystem::Bsd),
            other => Err(LifecycleError::OsParse(format!("{:#04x}", other))),
        }
    }
}

impl FromStr for OperatingSystem {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(OperatingSystem::Linux),
            "macos" | "osx" => Ok(OperatingSystem::MacOs),
            "windows" => Ok(OperatingSystem::Windows),
            "android" => Ok(OperatingSystem::Android),
            "ios" => Ok(OperatingSystem::Ios),
            "bsd" => Ok(OperatingSystem::Bsd),
            _ => Err(LifecycleError::OsParse(s.to_string())),
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::MacOs => "macos",
            OperatingSystem::Windows => "windows",
            OperatingSystem::Android => "android",
            OperatingSystem::Ios => "ios",
            OperatingSystem::Bsd => "bsd",
        };
        f.write_str(name)
    }
}

/// Launch parameters for a Reedb instance.
///
/// Optional fields distinguish "not supplied" from an explicit value, so only
/// supplied values override library defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Minimum password length for vaults created in this session.
    pub min_password_length: Option<u32>,

    /// Operating system the instance runs on.
    #[serde(rename = "os")]
    pub operating_system: Option<OperatingSystem>,

    /// Verbose logging to the master log.
    pub verbose: Option<bool>,

    /// Run detached; interaction then goes through the daemon transport.
    pub daemon: Option<bool>,

    /// Override of the operational path.
    pub operational_path: Option<PathBuf>,

    /// Ordered `key=value` tunable overrides.
    pub overrides: Vec<String>,
}

impl LaunchConfig {
    /// Create a config with the two required fields set.
    pub fn new(operating_system: OperatingSystem, min_password_length: u32) -> Self {
        Self {
            min_password_length: Some(min_password_length),
            operating_system: Some(operating_system),
            ..Self::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = Some(daemon);
        self
    }

    pub fn with_operational_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.operational_path = Some(path.into());
        self
    }

    pub fn with_override(mut self, entry: impl Into<String>) -> Self {
        self.overrides.push(entry.into());
        self
    }
}

/// Logging state of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogState {
    Disabled,
    #[default]
    Normal,
    Verbose,
}

impl FromStr for LogState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(LogState::Disabled),
            "normal" => Ok(LogState::Normal),
            "verbose" => Ok(LogState::Verbose),
            other => Err(format!("unknown log state '{}'", other)),
        }
    }
}

/// Settings the configuration store may change while an instance is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tunables {
    /// Debounce timeout before an idle vault is uncached.
    pub global_timeout: Duration,

    /// Current logging state.
    pub log_state: LogState,

    /// Allow the daemon's config set to be overridden at runtime.
    pub daemon_config_override: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            global_timeout: DEFAULT_GLOBAL_TIMEOUT,
            log_state: LogState::Normal,
            daemon_config_override: false,
        }
    }
}

impl Tunables {
    /// Apply a single override.
    pub fn apply(&mut self, tunable: &TunableOverride) {
        match *tunable {
            TunableOverride::GlobalTimeout(timeout) => self.global_timeout = timeout,
            TunableOverride::LogState(state) => self.log_state = state,
            TunableOverride::DaemonConfigOverride(enabled) => self.daemon_config_override = enabled,
        }
    }
}

/// A parsed `key=value` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunableOverride {
    /// `global_timeout=<seconds>`
    GlobalTimeout(Duration),
    /// `log_state=disabled|normal|verbose`
    LogState(LogState),
    /// `daemon_config_override=true|false`
    DaemonConfigOverride(bool),
}

impl FromStr for TunableOverride {
    type Err = LifecycleError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| LifecycleError::InvalidOverride {
            entry: entry.to_string(),
            message,
        };

        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| invalid("expected key=value".to_string()))?;
        let value = value.trim();

        match key.trim() {
            "global_timeout" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|e| invalid(format!("timeout must be whole seconds: {}", e)))?;
                if secs == 0 {
                    return Err(invalid("timeout must be greater than zero".to_string()));
                }
                Ok(TunableOverride::GlobalTimeout(Duration::from_secs(secs)))
            }
            "log_state" => value.parse().map(TunableOverride::LogState).map_err(invalid),
            "daemon_config_override" => value
                .parse()
                .map(TunableOverride::DaemonConfigOverride)
                .map_err(|e| invalid(format!("{}", e))),
            other => Err(invalid(format!("unknown key '{}'", other))),
        }
    }
}

/// Root of the config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReedbConfig {
    /// Launch parameters.
    pub launch: LaunchConfig,
}
