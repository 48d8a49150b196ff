//! Reedb vault lifecycle core.

pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::{LaunchConfig, OperatingSystem};
pub use config::ConfigStore;
pub use lifecycle::{ErrorCode, LifecycleError, Reedb, Subsystem, UserTask};
