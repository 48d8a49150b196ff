//! Runtime configuration store.
//!
//! # Responsibilities
//! - Read access to the effective instance settings
//! - Change tunables (timeout, log state, daemon config override) while active
//! - Enforce the passphrase policy of the running instance
//!
//! # Design Decisions
//! - Every call takes the instance lock, so store changes and lifecycle
//!   transitions never interleave
//! - Operating system and password length are fixed for the life of an
//!   instance; changing them requires terminate + initialize

use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::{LogState, OperatingSystem, TunableOverride};
use crate::lifecycle::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::instance::Reedb;
use crate::lifecycle::state::{InstanceSnapshot, InstanceState};

/// Configuration store bound to a [`Reedb`] handle.
#[derive(Clone)]
pub struct ConfigStore {
    reedb: Reedb,
}

impl ConfigStore {
    pub(crate) fn new(reedb: Reedb) -> Self {
        Self { reedb }
    }

    fn read<T>(&self, f: impl FnOnce(&InstanceState) -> T) -> T {
        f(&self.reedb.lock().state)
    }

    fn update<T>(&self, f: impl FnOnce(&mut InstanceState) -> LifecycleResult<T>) -> LifecycleResult<T> {
        let mut inner = self.reedb.lock();
        if !inner.state.active {
            return Err(LifecycleError::NotInitialised);
        }
        f(&mut inner.state)
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        self.read(|s| s.snapshot())
    }

    pub fn is_active(&self) -> bool {
        self.read(|s| s.active)
    }

    pub fn password_min_length(&self) -> u32 {
        self.read(|s| s.password_min_length)
    }

    pub fn operating_system(&self) -> Option<OperatingSystem> {
        self.read(|s| s.operating_system)
    }

    pub fn verbose(&self) -> bool {
        self.read(|s| s.verbose)
    }

    pub fn daemon_mode(&self) -> bool {
        self.read(|s| s.daemon)
    }

    pub fn no_token(&self) -> bool {
        self.read(|s| s.no_token)
    }

    pub fn global_timeout(&self) -> Duration {
        self.read(|s| s.tunables.global_timeout)
    }

    pub fn log_state(&self) -> LogState {
        self.read(|s| s.tunables.log_state)
    }

    pub fn daemon_config_override(&self) -> bool {
        self.read(|s| s.tunables.daemon_config_override)
    }

    /// Set the timeout before an idle vault is uncached.
    pub fn set_global_timeout(&self, timeout: Duration) -> LifecycleResult<()> {
        if timeout.is_zero() {
            return Err(LifecycleError::InvalidTunable("global timeout must be greater than zero".into()));
        }
        self.update(|s| {
            s.tunables.global_timeout = timeout;
            tracing::info!(timeout_secs = timeout.as_secs(), "Global timeout updated");
            Ok(())
        })
    }

    pub fn set_log_state(&self, state: LogState) -> LifecycleResult<()> {
        self.update(|s| {
            s.tunables.log_state = state;
            tracing::info!(log_state = ?state, "Log state updated");
            Ok(())
        })
    }

    /// Allow the daemon's config set to be overridden at runtime. Only
    /// meaningful in daemon mode.
    pub fn set_daemon_config_override(&self, enabled: bool) -> LifecycleResult<()> {
        self.update(|s| {
            if !s.daemon {
                return Err(LifecycleError::InvalidTunable(
                    "daemon config override requires daemon mode".into(),
                ));
            }
            s.tunables.daemon_config_override = enabled;
            tracing::info!(enabled, "Daemon config override updated");
            Ok(())
        })
    }

    /// Password length is fixed at initialize and can't be changed here.
    pub fn set_password_length(&self, _length: u32) -> LifecycleResult<()> {
        self.update(|_| Err(LifecycleError::AlreadyInitialised))
    }

    /// Effective operational path of the active instance.
    ///
    /// Fails with `MissingContainer` when the launch named no path and the
    /// platform has no default (mobile, or no home directory).
    pub fn operational_path(&self) -> LifecycleResult<PathBuf> {
        self.update(|s| match (&s.operational_path, s.operating_system) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(os)) => Err(LifecycleError::MissingContainer(os.to_string())),
            (None, None) => Err(LifecycleError::NotInitialised),
        })
    }

    /// Apply parsed overrides in order. All-or-nothing: the daemon-mode check
    /// runs before anything is applied.
    pub fn apply_overrides(&self, overrides: &[TunableOverride]) -> LifecycleResult<()> {
        self.update(|s| {
            let needs_daemon = overrides
                .iter()
                .any(|o| matches!(o, TunableOverride::DaemonConfigOverride(_)));
            if needs_daemon && !s.daemon {
                return Err(LifecycleError::InvalidTunable(
                    "daemon config override requires daemon mode".into(),
                ));
            }
            for tunable in overrides {
                s.tunables.apply(tunable);
            }
            tracing::info!(count = overrides.len(), tunables = ?s.tunables, "Overrides applied");
            Ok(())
        })
    }

    /// Check a passphrase against the instance's minimum length.
    pub fn check_passphrase(&self, passphrase: &str) -> LifecycleResult<()> {
        let required = self.password_min_length();
        let actual = passphrase.chars().count();
        if actual < required as usize {
            return Err(LifecycleError::ShortPassphrase { required, actual });
        }
        Ok(())
    }
}
