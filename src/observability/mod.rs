//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle and config store produce:
//!     → logging.rs (structured log events, instance_id on lifecycle events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted messages where possible
//! - Log filter follows the instance log state unless RUST_LOG is set

pub mod logging;
pub mod metrics;
