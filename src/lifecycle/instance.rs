//! The instance handle.
//!
//! # Data Flow
//! ```text
//! initialize(config, task):
//!     check_required → already active? → resolve
//!     → start subsystems → launch task → commit
//!
//! terminate(reason):
//!     active? → broadcast shutdown → stop subsystems (reverse)
//!     → reset to defaults
//! ```
//!
//! # Design Decisions
//! - One mutex guards all instance state; readers always see either the
//!   fully inactive or the fully committed state
//! - Validation completes before anything is mutated
//! - Terminate always ends inactive, teardown errors are reported afterwards
//! - A poisoned lock is recovered rather than propagated, so a panicking
//!   subsystem can't leave the instance stuck active

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use uuid::Uuid;

use crate::config::schema::{LaunchConfig, OperatingSystem};
use crate::config::store::ConfigStore;
use crate::config::validation::{check_required, resolve};
use crate::lifecycle::error::{ErrorCode, LifecycleError, LifecycleResult};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::{InstanceSnapshot, InstanceState};
use crate::lifecycle::subsystem::{Subsystem, SubsystemSet};
use crate::lifecycle::task::UserTask;
use crate::observability::metrics;

pub(crate) struct Inner {
    pub state: InstanceState,
    subsystems: SubsystemSet,
}

/// Handle to a Reedb instance.
///
/// Clones share the same instance. At most one instance is active per handle;
/// use [`Reedb::shared`] where a single instance per process is required.
#[derive(Clone)]
pub struct Reedb {
    inner: Arc<Mutex<Inner>>,
}

impl Reedb {
    /// Create a new, inactive instance handle with library defaults.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: InstanceState::default(),
                subsystems: SubsystemSet::default(),
            })),
        }
    }

    /// The process-wide instance handle.
    pub fn shared() -> &'static Reedb {
        static SHARED: OnceLock<Reedb> = OnceLock::new();
        SHARED.get_or_init(Reedb::new)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a subsystem to be started on the next initialize.
    pub fn attach<S>(&self, subsystem: S) -> LifecycleResult<()>
    where
        S: Subsystem + 'static,
    {
        let mut inner = self.lock();
        if inner.state.active {
            return Err(LifecycleError::AlreadyInitialised);
        }
        tracing::debug!(subsystem = %subsystem.name(), position = inner.subsystems.len(), "Subsystem attached");
        inner.subsystems.attach(Box::new(subsystem));
        Ok(())
    }

    /// Names of attached subsystems, in start order.
    pub fn subsystems(&self) -> Vec<String> {
        self.lock().subsystems.names()
    }

    /// Initialize the instance.
    ///
    /// Fails without touching state if the config is incomplete, a non-daemon
    /// launch has no task, or the instance is already active. The task, if
    /// any, is launched on its own thread and never blocks this call.
    pub fn initialize(&self, config: LaunchConfig, task: Option<UserTask>) -> LifecycleResult<()> {
        let result = self.try_initialize(config, task);
        match &result {
            Ok(()) => {
                metrics::record_init(ErrorCode::Success);
                metrics::record_instance_active(true);
            }
            Err(e) => {
                metrics::record_init(e.code());
                tracing::warn!(code = %e.code(), error = %e, "Initialize rejected");
            }
        }
        result
    }

    fn try_initialize(&self, config: LaunchConfig, task: Option<UserTask>) -> LifecycleResult<()> {
        check_required(&config, task.is_some())?;

        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.state.active {
            return Err(LifecycleError::AlreadyInitialised);
        }

        let launch = resolve(&config)?;
        let instance_id = Uuid::new_v4();
        let shutdown = Shutdown::new();

        // Subsystems see the configuration about to be committed.
        let mut pending = InstanceState::default();
        pending.activate(launch.clone(), instance_id, shutdown.clone(), task.is_some());
        inner.subsystems.start_all(&pending.snapshot())?;

        let task_launched = match task {
            Some(task) => {
                if let Err(e) = task.launch(instance_id, shutdown.subscribe()) {
                    for failure in inner.subsystems.stop_all() {
                        tracing::warn!(subsystem = %failure.subsystem, error = %failure.error, "Rollback stop failed");
                    }
                    return Err(e);
                }
                true
            }
            None => false,
        };

        inner.state.activate(launch, instance_id, shutdown, task_launched);

        let state = &inner.state;
        tracing::info!(
            instance_id = %instance_id,
            os = ?state.operating_system,
            daemon = state.daemon,
            verbose = state.verbose,
            password_min_length = state.password_min_length,
            operational_path = ?state.operational_path,
            task_launched,
            "Reedb initialised"
        );
        Ok(())
    }

    /// Terminate the instance.
    ///
    /// The instance is inactive when this returns, whatever the result. A
    /// `Teardown` error lists the subsystems that failed to stop.
    pub fn terminate(&self, reason: &str) -> LifecycleResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if !inner.state.active {
            metrics::record_terminate("not_initialised");
            return Err(LifecycleError::NotInitialised);
        }

        let instance_id = inner.state.instance_id;
        tracing::info!(instance_id = ?instance_id, reason = %reason, "Terminating Reedb");

        if let Some(shutdown) = &inner.state.shutdown {
            shutdown.trigger();
        }
        let failures = inner.subsystems.stop_all();
        inner.state.reset();
        drop(guard);

        metrics::record_instance_active(false);

        if failures.is_empty() {
            metrics::record_terminate("clean");
            tracing::info!(instance_id = ?instance_id, "Reedb terminated");
            Ok(())
        } else {
            metrics::record_terminate("incomplete");
            for failure in &failures {
                tracing::error!(
                    instance_id = ?instance_id,
                    subsystem = %failure.subsystem,
                    error = %failure.error,
                    "Subsystem failed to stop"
                );
            }
            Err(LifecycleError::Teardown { failures })
        }
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> InstanceSnapshot {
        self.lock().state.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.lock().state.active
    }

    pub fn operating_system(&self) -> Option<OperatingSystem> {
        self.lock().state.operating_system
    }

    pub fn password_min_length(&self) -> u32 {
        self.lock().state.password_min_length
    }

    pub fn verbose(&self) -> bool {
        self.lock().state.verbose
    }

    pub fn daemon_mode(&self) -> bool {
        self.lock().state.daemon
    }

    /// Configuration store bound to this instance.
    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::new(self.clone())
    }
}

impl Default for Reedb {
    fn default() -> Self {
        Self::new()
    }
}
