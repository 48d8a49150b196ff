//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! LaunchConfig (built in code or loaded from TOML by loader.rs)
//!     → validation.rs (required fields, path, overrides)
//!     → committed into the instance on initialize
//!
//! While active:
//!     store.rs reads effective settings, changes tunables
//!     watcher.rs detects file change
//!     → loader.rs reparses overrides
//!     → store.rs applies them
//! ```
//!
//! # Design Decisions
//! - Optional fields separate "not supplied" from explicit values
//! - Operating system and password length are immutable while active
//! - Only tunables change at runtime; everything else needs a re-initialize

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use schema::LaunchConfig;
pub use schema::LogState;
pub use schema::OperatingSystem;
pub use schema::TunableOverride;
pub use store::ConfigStore;
