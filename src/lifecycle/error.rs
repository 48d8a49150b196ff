//! Lifecycle error codes and error type.
//!
//! # Design Decisions
//! - `ErrorCode` values are stable across releases; they end up in logs and
//!   process exit statuses and are used to correlate failures across processes
//! - Every `LifecycleError` maps to exactly one `ErrorCode`

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error type surfaced by subsystems during start/stop.
pub type SubsystemError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable error codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Failure = -1,
    Success = 0,
    MissingParams = 0xA0,
    MissingUserCode = 0xA1,
    MissingContainer = 0xA2,
    AllocationFailed = 0xA3,
    AlreadyInitialised = 0xA4,
    OsParseFailed = 0xA5,
    ZombieInstance = 0xA6,
    InvalidPath = 0xA7,
    ShortPassphrase = 0xA8,
    NotInitialised = 0xA9,
}

impl ErrorCode {
    /// Numeric value of this code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Short name used in logs and metric labels.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Failure => "failure",
            ErrorCode::Success => "success",
            ErrorCode::MissingParams => "missing_params",
            ErrorCode::MissingUserCode => "missing_user_code",
            ErrorCode::MissingContainer => "missing_container",
            ErrorCode::AllocationFailed => "allocation_failed",
            ErrorCode::AlreadyInitialised => "already_initialised",
            ErrorCode::OsParseFailed => "os_parse_failed",
            ErrorCode::ZombieInstance => "zombie_instance",
            ErrorCode::InvalidPath => "invalid_path",
            ErrorCode::ShortPassphrase => "short_passphrase",
            ErrorCode::NotInitialised => "not_initialised",
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        match val {
            -1 => Ok(ErrorCode::Failure),
            0 => Ok(ErrorCode::Success),
            0xA0 => Ok(ErrorCode::MissingParams),
            0xA1 => Ok(ErrorCode::MissingUserCode),
            0xA2 => Ok(ErrorCode::MissingContainer),
            0xA3 => Ok(ErrorCode::AllocationFailed),
            0xA4 => Ok(ErrorCode::AlreadyInitialised),
            0xA5 => Ok(ErrorCode::OsParseFailed),
            0xA6 => Ok(ErrorCode::ZombieInstance),
            0xA7 => Ok(ErrorCode::InvalidPath),
            0xA8 => Ok(ErrorCode::ShortPassphrase),
            0xA9 => Ok(ErrorCode::NotInitialised),
            other => Err(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.as_i32();
        if code < 0 {
            write!(f, "{} ({})", self.name(), code)
        } else {
            write!(f, "{} ({:#04x})", self.name(), code)
        }
    }
}

/// A subsystem that failed to stop during teardown.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Name of the subsystem.
    pub subsystem: String,
    /// The error it reported.
    pub error: SubsystemError,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subsystem, self.error)
    }
}

/// Errors returned by lifecycle and configuration store operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A required launch parameter is missing or out of range.
    #[error("Required parameters not set in launch config: {0}")]
    MissingParams(&'static str),

    /// Non-daemon instance without user code to run.
    #[error("No user code provided to run; a non-daemon instance needs a task")]
    MissingUserCode,

    /// An instance is already active on this handle.
    #[error("Can't change this parameter! Reedb was already initialised")]
    AlreadyInitialised,

    /// No instance is active on this handle.
    #[error("Reedb wasn't previously initialised")]
    NotInitialised,

    /// The operating system name could not be parsed.
    #[error("Unknown operating system: {0}")]
    OsParse(String),

    /// No operational path override on a platform without a default container.
    #[error("No operational container on {0}; an operational path override is required")]
    MissingContainer(String),

    /// The operational path is unusable.
    #[error("Invalid operational path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A passphrase is shorter than the instance minimum.
    #[error("Passphrase too short: {actual} characters, at least {required} required")]
    ShortPassphrase { required: u32, actual: usize },

    /// Spawning the user task worker failed.
    #[error("Failed to launch user task: {0}")]
    AllocationFailed(#[source] std::io::Error),

    /// A config override entry was malformed or unknown.
    #[error("Invalid config override '{entry}': {message}")]
    InvalidOverride { entry: String, message: String },

    /// A tunable value was rejected by the configuration store.
    #[error("Invalid tunable: {0}")]
    InvalidTunable(String),

    /// A subsystem failed to start; already-started subsystems were stopped again.
    #[error("Subsystem '{subsystem}' failed to start: {error}")]
    SubsystemStart {
        subsystem: String,
        error: SubsystemError,
    },

    /// One or more subsystems failed to stop. The instance is inactive regardless.
    #[error("Teardown incomplete, {} subsystem(s) failed to stop: {}", .failures.len(), join_failures(.failures))]
    Teardown { failures: Vec<TeardownFailure> },
}

impl LifecycleError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LifecycleError::MissingParams(_) => ErrorCode::MissingParams,
            LifecycleError::MissingUserCode => ErrorCode::MissingUserCode,
            LifecycleError::AlreadyInitialised => ErrorCode::AlreadyInitialised,
            LifecycleError::NotInitialised => ErrorCode::NotInitialised,
            LifecycleError::OsParse(_) => ErrorCode::OsParseFailed,
            LifecycleError::MissingContainer(_) => ErrorCode::MissingContainer,
            LifecycleError::InvalidPath(_) => ErrorCode::InvalidPath,
            LifecycleError::ShortPassphrase { .. } => ErrorCode::ShortPassphrase,
            LifecycleError::AllocationFailed(_) => ErrorCode::AllocationFailed,
            LifecycleError::InvalidOverride { .. } => ErrorCode::Failure,
            LifecycleError::InvalidTunable(_) => ErrorCode::Failure,
            LifecycleError::SubsystemStart { .. } => ErrorCode::Failure,
            LifecycleError::Teardown { .. } => ErrorCode::ZombieInstance,
        }
    }
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
