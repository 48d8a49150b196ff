//! Subsystems started and stopped with the instance.
//!
//! # Responsibilities
//! - Start attached subsystems in attachment order on initialize
//! - Stop started subsystems in reverse order on terminate
//!
//! # Design Decisions
//! - Fail fast on start: the first start failure stops everything already
//!   started and fails the initialize
//! - Best effort on stop: every subsystem gets a stop call, failures are
//!   collected and reported together

use crate::lifecycle::error::{LifecycleError, SubsystemError, TeardownFailure};
use crate::lifecycle::state::InstanceSnapshot;
use crate::observability::metrics;

/// An external collaborator whose lifetime is bound to the instance, such as
/// the vault storage engine or the daemon transport.
///
/// Implementations must not call back into the owning `Reedb` handle from
/// `start` or `stop`; both run while the instance lock is held.
pub trait Subsystem: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Start with the configuration about to be committed.
    fn start(&mut self, instance: &InstanceSnapshot) -> Result<(), SubsystemError>;

    /// Stop. Called once for every successful `start`.
    fn stop(&mut self) -> Result<(), SubsystemError>;
}

/// Ordered set of attached subsystems.
#[derive(Default)]
pub(crate) struct SubsystemSet {
    entries: Vec<Box<dyn Subsystem>>,
    /// Number of entries (from the front) currently started.
    started: usize,
}

impl SubsystemSet {
    pub fn attach(&mut self, subsystem: Box<dyn Subsystem>) {
        self.entries.push(subsystem);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|s| s.name().to_string()).collect()
    }

    /// Start every subsystem in order. On failure, stop the ones already
    /// started and return the start error.
    ///
    /// Subsystems still marked started (a previous start or stop panicked)
    /// are stopped first.
    pub fn start_all(&mut self, instance: &InstanceSnapshot) -> Result<(), LifecycleError> {
        if self.started > 0 {
            tracing::warn!(leftover = self.started, "Stopping subsystems left running by an interrupted lifecycle call");
            for failure in self.stop_all() {
                tracing::warn!(subsystem = %failure.subsystem, error = %failure.error, "Leftover stop failed");
            }
        }

        for idx in 0..self.entries.len() {
            let subsystem = &mut self.entries[idx];
            match subsystem.start(instance) {
                Ok(()) => {
                    tracing::debug!(subsystem = %subsystem.name(), "Subsystem started");
                    self.started = idx + 1;
                }
                Err(error) => {
                    let name = subsystem.name().to_string();
                    tracing::error!(subsystem = %name, error = %error, "Subsystem failed to start, rolling back");
                    for failure in self.stop_all() {
                        tracing::warn!(subsystem = %failure.subsystem, error = %failure.error, "Rollback stop failed");
                    }
                    return Err(LifecycleError::SubsystemStart { subsystem: name, error });
                }
            }
        }
        Ok(())
    }

    /// Stop started subsystems in reverse order, collecting failures.
    pub fn stop_all(&mut self) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        while self.started > 0 {
            self.started -= 1;
            let subsystem = &mut self.entries[self.started];
            match subsystem.stop() {
                Ok(()) => tracing::debug!(subsystem = %subsystem.name(), "Subsystem stopped"),
                Err(error) => {
                    metrics::record_stop_failure(subsystem.name());
                    failures.push(TeardownFailure {
                        subsystem: subsystem.name().to_string(),
                        error,
                    });
                }
            }
        }
        failures
    }
}
