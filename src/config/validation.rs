//! Launch configuration validation.
//!
//! # Responsibilities
//! - Reject launch configs missing required fields
//! - Resolve the effective operational path
//! - Parse tunable overrides
//!
//! # Design Decisions
//! - Checks run in a fixed order and the first failure wins
//! - Validation is pure: nothing here touches instance state
//! - Split in two phases so the lifecycle can check for an active instance
//!   between required-field checks and path/override resolution

use std::path::{Path, PathBuf};

use crate::config::schema::{
    LaunchConfig, LogState, OperatingSystem, TunableOverride, Tunables, MIN_PASSLENGTH,
};
use crate::lifecycle::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::state::{DEFAULT_DAEMON, DEFAULT_VERBOSE};

/// A launch config that passed validation, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLaunch {
    pub operating_system: OperatingSystem,
    pub password_min_length: u32,
    pub daemon: bool,
    pub verbose: bool,
    /// `None` when there is no override and the platform has no default.
    pub operational_path: Option<PathBuf>,
    pub tunables: Tunables,
}

/// Check the fields every launch needs.
///
/// Order: operating system, password length, user code.
pub fn check_required(config: &LaunchConfig, has_task: bool) -> LifecycleResult<()> {
    if config.operating_system.is_none() {
        return Err(LifecycleError::MissingParams("operating system not set"));
    }

    match config.min_password_length {
        None => return Err(LifecycleError::MissingParams("minimum password length not set")),
        Some(len) if len < MIN_PASSLENGTH => {
            return Err(LifecycleError::MissingParams("minimum password length below system minimum"))
        }
        Some(_) => {}
    }

    let daemon = config.daemon.unwrap_or(DEFAULT_DAEMON);
    if !has_task && !daemon {
        return Err(LifecycleError::MissingUserCode);
    }

    Ok(())
}

/// Resolve the operational path and overrides into a `ValidatedLaunch`.
///
/// Callers must have run [`check_required`] first.
pub fn resolve(config: &LaunchConfig) -> LifecycleResult<ValidatedLaunch> {
    let operating_system = config
        .operating_system
        .ok_or(LifecycleError::MissingParams("operating system not set"))?;
    let password_min_length = config
        .min_password_length
        .filter(|len| *len >= MIN_PASSLENGTH)
        .ok_or(LifecycleError::MissingParams("minimum password length not set"))?;

    let operational_path = match &config.operational_path {
        Some(path) => Some(check_operational_path(path)?),
        None => default_operational_path(operating_system, dirs::home_dir().as_deref()),
    };

    let verbose = config.verbose.unwrap_or(DEFAULT_VERBOSE);
    let mut tunables = Tunables {
        log_state: if verbose { LogState::Verbose } else { LogState::Normal },
        ..Tunables::default()
    };
    for tunable in parse_overrides(&config.overrides)? {
        tunables.apply(&tunable);
    }

    Ok(ValidatedLaunch {
        operating_system,
        password_min_length,
        daemon: config.daemon.unwrap_or(DEFAULT_DAEMON),
        verbose,
        operational_path,
        tunables,
    })
}

/// Parse override entries in order. The first malformed entry fails the batch.
pub fn parse_overrides(entries: &[String]) -> LifecycleResult<Vec<TunableOverride>> {
    entries.iter().map(|entry| entry.parse()).collect()
}

/// An explicit operational path must be absolute. Nothing is checked on disk.
pub fn check_operational_path(path: &Path) -> LifecycleResult<PathBuf> {
    if path.as_os_str().is_empty() || !path.is_absolute() {
        return Err(LifecycleError::InvalidPath(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

/// Default operational path for an operating system, rooted at `home`.
///
/// Mobile platforms keep data in an app container the caller has to name, so
/// they have no default. Neither does a desktop without a home directory.
pub fn default_operational_path(os: OperatingSystem, home: Option<&Path>) -> Option<PathBuf> {
    let home = home?;
    match os {
        OperatingSystem::Linux | OperatingSystem::Bsd => Some(home.join(".local").join("share").join("reedb")),
        OperatingSystem::MacOs => Some(home.join("Library").join("Application Support").join("Reedb")),
        OperatingSystem::Windows => Some(home.join("AppData").join("Roaming").join("Reedb")),
        OperatingSystem::Android | OperatingSystem::Ios => None,
    }
}
