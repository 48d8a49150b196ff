//! User task launch.
//!
//! # Responsibilities
//! - Wrap caller code to run alongside the instance
//! - Hand it to a dedicated worker thread so initialize returns immediately
//!
//! # Design Decisions
//! - Launch and forget: the instance records that the task was launched, it
//!   never joins or cancels it
//! - The task receives a shutdown receiver so it can wind down on terminate

use std::fmt;
use std::thread;

use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use crate::lifecycle::error::{LifecycleError, LifecycleResult};

/// Context handed to a running user task.
pub struct TaskContext {
    instance_id: Uuid,
    shutdown: broadcast::Receiver<()>,
}

impl TaskContext {
    /// ID of the instance that launched this task.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Non-blocking check for a terminate of the owning instance.
    pub fn is_shutdown_requested(&mut self) -> bool {
        match self.shutdown.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Lagged(_)) | Err(TryRecvError::Closed) => true,
        }
    }

    /// Block the worker thread until the owning instance terminates.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait_for_shutdown(mut self) {
        let _ = self.shutdown.blocking_recv();
    }

    /// Async variant of [`TaskContext::wait_for_shutdown`].
    pub async fn shutdown_signal(mut self) {
        let _ = self.shutdown.recv().await;
    }
}

/// Caller code executed in parallel with the instance.
pub struct UserTask {
    name: String,
    run: Box<dyn FnOnce(TaskContext) + Send + 'static>,
}

impl UserTask {
    /// Wrap a closure as a user task.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(TaskContext) + Send + 'static,
    {
        Self {
            name: "reedb-user".to_string(),
            run: Box::new(f),
        }
    }

    /// Name the worker thread.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the task on its own thread.
    pub(crate) fn launch(
        self,
        instance_id: Uuid,
        shutdown: broadcast::Receiver<()>,
    ) -> LifecycleResult<()> {
        let ctx = TaskContext { instance_id, shutdown };
        let run = self.run;
        thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run(ctx))
            .map_err(LifecycleError::AllocationFailed)?;

        tracing::debug!(instance_id = %instance_id, task = %self.name, "User task launched");
        Ok(())
    }
}

impl fmt::Debug for UserTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserTask").field("name", &self.name).finish_non_exhaustive()
    }
}
