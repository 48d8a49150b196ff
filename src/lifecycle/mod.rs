//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Initialize (instance.rs):
//!     Validate config → Start subsystems (subsystem.rs) → Launch user task (task.rs) → Commit state (state.rs)
//!
//! Terminate (instance.rs):
//!     Broadcast shutdown (shutdown.rs) → Stop subsystems in reverse → Reset state
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → terminate with the signal as reason
//! ```
//!
//! # Design Decisions
//! - Two states only: Inactive and Active, no re-initialize while active
//! - Ordered startup, reverse-ordered teardown
//! - Teardown is best effort and always ends inactive

pub mod error;
pub mod instance;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod subsystem;
pub mod task;

pub use error::{ErrorCode, LifecycleError, LifecycleResult};
pub use instance::Reedb;
pub use shutdown::Shutdown;
pub use state::InstanceSnapshot;
pub use subsystem::Subsystem;
pub use task::{TaskContext, UserTask};
