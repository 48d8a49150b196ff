//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the daemon binary
//! - Map the instance `LogState` to a log filter
//! - Swap the filter at runtime when the log state changes
//!
//! # Design Decisions
//! - `RUST_LOG`, when set, wins over the log state and is never replaced
//! - Library code only emits events; installing a subscriber is the binary's job

use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::schema::LogState;

/// Filter directive for a log state.
pub fn directive(state: LogState) -> &'static str {
    match state {
        LogState::Disabled => "off",
        LogState::Normal => "reedb=info",
        LogState::Verbose => "reedb=debug",
    }
}

/// Handle for changing the log filter after initialization.
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogHandle {
    /// Apply a log state. Ignored when the filter came from `RUST_LOG`.
    pub fn apply(&self, state: LogState) {
        if self.env_override {
            tracing::debug!(log_state = ?state, "RUST_LOG set, keeping environment filter");
            return;
        }
        if let Err(e) = self.handle.reload(EnvFilter::new(directive(state))) {
            tracing::error!(error = %e, "Failed to reload log filter");
        }
    }
}

/// Install the global subscriber.
pub fn init_logging(state: LogState) -> LogHandle {
    let (filter, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(directive(state)), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogHandle {
        handle,
        env_override,
    }
}
