//! Metrics collection.
//!
//! # Metrics
//! - `reedb_init_total` (counter): initialize calls by result code
//! - `reedb_terminate_total` (counter): terminate calls by outcome
//! - `reedb_subsystem_stop_failures_total` (counter): teardown failures by subsystem
//! - `reedb_instance_active` (gauge): 1=active, 0=inactive
//!
//! # Design Decisions
//! - Facade only; installing a recorder/exporter is left to the embedding
//!   application, so these calls are no-ops until one is installed

use crate::lifecycle::error::ErrorCode;

/// Record the result of an initialize call.
pub fn record_init(code: ErrorCode) {
    metrics::counter!("reedb_init_total", "code" => code.name()).increment(1);
}

/// Record the outcome of a terminate call.
pub fn record_terminate(outcome: &'static str) {
    metrics::counter!("reedb_terminate_total", "outcome" => outcome).increment(1);
}

/// Record a subsystem that failed to stop.
pub fn record_stop_failure(subsystem: &str) {
    metrics::counter!("reedb_subsystem_stop_failures_total", "subsystem" => subsystem.to_string())
        .increment(1);
}

/// Record whether the instance is active.
pub fn record_instance_active(active: bool) {
    metrics::gauge!("reedb_instance_active").set(if active { 1.0 } else { 0.0 });
}
