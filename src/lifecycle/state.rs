//! Instance state.
//!
//! # States
//! - Inactive: library defaults, no subsystems running
//! - Active: launch config committed, subsystems started
//!
//! # State Transitions
//! ```text
//! Inactive → Active: successful initialize
//! Active → Inactive: terminate (always, even when teardown fails)
//! ```

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::config::schema::{OperatingSystem, Tunables, MIN_PASSLENGTH};
use crate::config::validation::ValidatedLaunch;
use crate::lifecycle::shutdown::Shutdown;

pub const DEFAULT_DAEMON: bool = true;
pub const DEFAULT_VERBOSE: bool = false;
pub const DEFAULT_NO_TOKEN: bool = false;

/// Mutable state of one instance. Only ever touched under the handle's lock.
#[derive(Debug)]
pub(crate) struct InstanceState {
    pub active: bool,
    pub daemon: bool,
    pub verbose: bool,
    pub password_min_length: u32,
    pub operating_system: Option<OperatingSystem>,
    /// Reserved for token-less operation.
    pub no_token: bool,
    pub instance_id: Option<Uuid>,
    pub operational_path: Option<PathBuf>,
    pub tunables: Tunables,
    pub task_launched: bool,
    pub shutdown: Option<Shutdown>,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            active: false,
            daemon: DEFAULT_DAEMON,
            verbose: DEFAULT_VERBOSE,
            password_min_length: MIN_PASSLENGTH,
            operating_system: None,
            no_token: DEFAULT_NO_TOKEN,
            instance_id: None,
            operational_path: None,
            tunables: Tunables::default(),
            task_launched: false,
            shutdown: None,
        }
    }
}

impl InstanceState {
    /// Commit a validated launch in one step.
    pub fn activate(
        &mut self,
        launch: ValidatedLaunch,
        instance_id: Uuid,
        shutdown: Shutdown,
        task_launched: bool,
    ) {
        *self = Self {
            active: true,
            daemon: launch.daemon,
            verbose: launch.verbose,
            password_min_length: launch.password_min_length,
            operating_system: Some(launch.operating_system),
            no_token: self.no_token,
            instance_id: Some(instance_id),
            operational_path: launch.operational_path,
            tunables: launch.tunables,
            task_launched,
            shutdown: Some(shutdown),
        };
    }

    /// Restore library defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            active: self.active,
            daemon: self.daemon,
            verbose: self.verbose,
            password_min_length: self.password_min_length,
            operating_system: self.operating_system,
            no_token: self.no_token,
            instance_id: self.instance_id,
            operational_path: self.operational_path.clone(),
            tunables: self.tunables,
            task_launched: self.task_launched,
        }
    }
}

/// A consistent, read-only copy of the instance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSnapshot {
    pub active: bool,
    pub daemon: bool,
    pub verbose: bool,
    pub password_min_length: u32,
    pub operating_system: Option<OperatingSystem>,
    pub no_token: bool,
    pub instance_id: Option<Uuid>,
    pub operational_path: Option<PathBuf>,
    pub tunables: Tunables,
    pub task_launched: bool,
}
