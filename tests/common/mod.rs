//! Shared utilities for integration tests.

use std::sync::{Arc, Mutex};

use reedb::lifecycle::error::SubsystemError;
use reedb::lifecycle::InstanceSnapshot;
use reedb::{LaunchConfig, OperatingSystem, Subsystem};

/// Ordered record of subsystem calls, shared between mocks.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A valid launch config with an explicit operational path, so tests don't
/// depend on the home directory.
pub fn valid_config(os: OperatingSystem) -> LaunchConfig {
    LaunchConfig::new(os, 4).with_operational_path("/var/lib/reedb-test")
}

/// A scripted stand-in for the storage engine or daemon transport.
pub struct MockSubsystem {
    name: &'static str,
    log: CallLog,
    fail_start: bool,
    fail_stop: bool,
    panic_start: bool,
    panic_stop: bool,
}

impl MockSubsystem {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
            panic_start: false,
            panic_stop: false,
        }
    }

    #[allow(dead_code)]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    #[allow(dead_code)]
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Panic on the first start only.
    #[allow(dead_code)]
    pub fn panicking_start(mut self) -> Self {
        self.panic_start = true;
        self
    }

    /// Panic on the first stop only.
    #[allow(dead_code)]
    pub fn panicking_stop(mut self) -> Self {
        self.panic_stop = true;
        self
    }
}

impl Subsystem for MockSubsystem {
    fn name(&self) -> &str {
        self.name
    }

    fn start(&mut self, instance: &InstanceSnapshot) -> Result<(), SubsystemError> {
        self.log.lock().unwrap().push(format!(
            "start {} os={:?}",
            self.name, instance.operating_system
        ));
        if std::mem::take(&mut self.panic_start) {
            panic!("{} panicked on start", self.name);
        }
        if self.fail_start {
            return Err(format!("{} refused to start", self.name).into());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SubsystemError> {
        self.log.lock().unwrap().push(format!("stop {}", self.name));
        if std::mem::take(&mut self.panic_stop) {
            panic!("{} panicked on stop", self.name);
        }
        if self.fail_stop {
            return Err(format!("{} stuck", self.name).into());
        }
        Ok(())
    }
}
