//! Reedb daemon.
//!
//! Starts a daemon-mode Reedb instance, keeps its tunables in sync with the
//! config file, and terminates it on SIGINT/SIGTERM.
//!
//! ```text
//!   reedb.toml ──▶ loader ──▶ LaunchConfig ──▶ Reedb::initialize
//!       │                                          │
//!       └──▶ watcher ──▶ ConfigStore::apply_overrides
//!                                                  │
//!   SIGINT/SIGTERM ─────────────────────▶ Reedb::terminate(reason)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;

use reedb::config::loader::{load_config, ConfigError};
use reedb::config::watcher::{ConfigReload, ConfigWatcher};
use reedb::config::{ConfigStore, LaunchConfig, LogState, OperatingSystem};
use reedb::lifecycle::signals::wait_for_signal;
use reedb::lifecycle::{ErrorCode, LifecycleError, Reedb};
use reedb::observability::logging::{init_logging, LogHandle};

#[derive(Parser)]
#[command(name = "reedb")]
#[command(about = "Reedb vault daemon", long_about = None)]
struct Cli {
    /// Launch config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Operating system (linux, macos, windows, android, ios, bsd)
    #[arg(long)]
    os: Option<OperatingSystem>,

    /// Minimum password length for vaults created in this session
    #[arg(short = 'p', long)]
    password_length: Option<u32>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the operational path
    #[arg(long)]
    operational_path: Option<PathBuf>,

    /// Tunable override (key=value), may be repeated
    #[arg(short = 's', long = "set")]
    overrides: Vec<String>,

    /// Print the instance state as JSON after startup
    #[arg(long)]
    print_state: bool,
}

impl Cli {
    /// Flags take precedence over the config file.
    fn merge_into(&self, config: &mut LaunchConfig) {
        if let Some(os) = self.os {
            config.operating_system = Some(os);
        }
        if let Some(len) = self.password_length {
            config.min_password_length = Some(len);
        }
        if self.verbose {
            config.verbose = Some(true);
        }
        if let Some(path) = &self.operational_path {
            config.operational_path = Some(path.clone());
        }
        config.overrides.extend(self.overrides.iter().cloned());
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(e.as_ref());
            tracing::error!(code = %code, "{}", e);
            eprintln!("reedb: {}", e);
            ExitCode::from(code.as_i32() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LaunchConfig::default(),
    };
    cli.merge_into(&mut config);

    let initial_log = if config.verbose == Some(true) {
        LogState::Verbose
    } else {
        LogState::Normal
    };
    let log = init_logging(initial_log);

    tracing::info!("reedb v{} starting", env!("CARGO_PKG_VERSION"));

    let reedb = Reedb::shared();
    reedb.initialize(config, None)?;

    let store = reedb.config_store();
    log.apply(store.log_state());

    if cli.print_state {
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    }

    // Keep the watcher alive until shutdown.
    let (_watcher, mut reloads) = match &cli.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(w) => (Some(w), Some(rx)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, reloads disabled");
                    (None, None)
                }
            }
        }
        None => (None, None),
    };

    let signal = wait_for_signal();
    tokio::pin!(signal);

    let reason = loop {
        tokio::select! {
            sig = &mut signal => break sig.to_string(),
            reload = next_reload(&mut reloads) => match reload {
                Some(reload) => apply_reload(&store, &log, reload),
                None => reloads = None,
            },
        }
    };

    reedb.terminate(&reason)?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn next_reload(rx: &mut Option<mpsc::UnboundedReceiver<ConfigReload>>) -> Option<ConfigReload> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn apply_reload(store: &ConfigStore, log: &LogHandle, reload: ConfigReload) {
    let current = store.snapshot();
    let launch = &reload.launch;
    if launch.operating_system.is_some() && launch.operating_system != current.operating_system {
        tracing::warn!("Operating system changed in config file; restart required, ignoring");
    }
    if launch.min_password_length.is_some_and(|len| len != current.password_min_length) {
        tracing::warn!("Password length changed in config file; restart required, ignoring");
    }

    match store.apply_overrides(&reload.overrides) {
        Ok(()) => log.apply(store.log_state()),
        Err(e) => tracing::error!(error = %e, "Rejected config reload, keeping current tunables"),
    }
}

fn exit_code(e: &(dyn std::error::Error + 'static)) -> ErrorCode {
    if let Some(e) = e.downcast_ref::<LifecycleError>() {
        return e.code();
    }
    if let Some(e) = e.downcast_ref::<ConfigError>() {
        return e.code();
    }
    ErrorCode::Failure
}
