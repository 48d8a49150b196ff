//! Lifecycle integration tests.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use reedb::config::LogState;
use reedb::lifecycle::LifecycleError;
use reedb::{ErrorCode, LaunchConfig, OperatingSystem, Reedb, UserTask};

mod common;

use common::{call_log, valid_config, MockSubsystem};

#[test]
fn test_valid_daemon_config_initializes() {
    let reedb = Reedb::new();
    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();

    assert!(reedb.is_active());
    assert_eq!(reedb.operating_system(), Some(OperatingSystem::Linux));
    assert_eq!(reedb.password_min_length(), 4);
    reedb.terminate("test complete").unwrap();
}

#[test]
fn test_missing_os_fails() {
    let reedb = Reedb::new();
    let mut config = valid_config(OperatingSystem::Linux);
    config.operating_system = None;

    let err = reedb.initialize(config, None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingParams);
    assert!(!reedb.is_active());
}

#[test]
fn test_short_password_length_fails() {
    let reedb = Reedb::new();
    let config = LaunchConfig::new(OperatingSystem::Windows, 3).with_operational_path("/var/lib/reedb-test");
    assert_eq!(reedb.initialize(config, None).unwrap_err().code(), ErrorCode::MissingParams);
    assert!(!reedb.is_active());
}

#[test]
fn test_non_daemon_without_task_fails() {
    let reedb = Reedb::new();
    let config = valid_config(OperatingSystem::Linux).with_daemon(false);

    let err = reedb.initialize(config, None).unwrap_err();
    assert!(matches!(err, LifecycleError::MissingUserCode));
    assert_eq!(err.code(), ErrorCode::MissingUserCode);
    assert!(!reedb.is_active());
}

#[test]
fn test_task_runs_without_blocking_caller() {
    let reedb = Reedb::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    // The task can only finish after initialize has returned and released it.
    let task = UserTask::new(move |_ctx| {
        release_rx.recv().unwrap();
        done_tx.send(std::thread::current().id()).unwrap();
    });

    let config = valid_config(OperatingSystem::Linux).with_daemon(false);
    reedb.initialize(config, Some(task)).unwrap();
    assert!(reedb.is_active());
    assert!(reedb.snapshot().task_launched);

    release_tx.send(()).unwrap();
    let task_thread = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(task_thread, std::thread::current().id());

    reedb.terminate("task finished").unwrap();
}

#[test]
fn test_task_notified_on_terminate() {
    let reedb = Reedb::new();
    let (tx, rx) = mpsc::channel();
    let task = UserTask::new(move |ctx| {
        ctx.wait_for_shutdown();
        tx.send(()).unwrap();
    });

    reedb
        .initialize(valid_config(OperatingSystem::Bsd).with_daemon(false), Some(task))
        .unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    reedb.terminate("user logout").unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn test_double_initialize_fails() {
    let reedb = Reedb::new();
    let first = valid_config(OperatingSystem::Linux).with_verbose(true);
    reedb.initialize(first, None).unwrap();
    let before = reedb.snapshot();

    let second = LaunchConfig::new(OperatingSystem::Windows, 16).with_operational_path("/srv/other");
    let err = reedb.initialize(second, None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyInitialised);

    // State from the first call is untouched.
    assert_eq!(reedb.snapshot(), before);
    assert_eq!(reedb.operating_system(), Some(OperatingSystem::Linux));
    assert!(reedb.verbose());

    reedb.terminate("done").unwrap();
}

#[test]
fn test_terminate_when_inactive_fails() {
    let reedb = Reedb::new();
    let err = reedb.terminate("nothing running").unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotInitialised);

    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();
    reedb.terminate("first").unwrap();
    assert_eq!(reedb.terminate("second").unwrap_err().code(), ErrorCode::NotInitialised);
}

#[test]
fn test_terminate_always_ends_inactive() {
    let log = call_log();
    let reedb = Reedb::new();
    reedb.attach(MockSubsystem::new("storage", &log).failing_stop()).unwrap();
    reedb.attach(MockSubsystem::new("transport", &log)).unwrap();

    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();
    let err = reedb.terminate("shutdown").unwrap_err();

    assert_eq!(err.code(), ErrorCode::ZombieInstance);
    match err {
        LifecycleError::Teardown { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].subsystem, "storage");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!reedb.is_active());

    // Every subsystem got its stop call, in reverse order.
    let calls = log.lock().unwrap().clone();
    assert_eq!(calls[2..], ["stop transport".to_string(), "stop storage".to_string()]);

    // The instance can be brought up again.
    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();
    assert!(reedb.is_active());

    // Storage still fails to stop, and the instance still ends inactive.
    let err = reedb.terminate("again").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ZombieInstance);
    assert!(!reedb.is_active());
}

#[test]
fn test_subsystem_start_failure_rolls_back() {
    let log = call_log();
    let reedb = Reedb::new();
    reedb.attach(MockSubsystem::new("storage", &log)).unwrap();
    reedb.attach(MockSubsystem::new("transport", &log).failing_start()).unwrap();

    let err = reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Failure);
    assert!(!reedb.is_active());
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "start storage os=Some(Linux)".to_string(),
            "start transport os=Some(Linux)".to_string(),
            "stop storage".to_string(),
        ]
    );
}

#[test]
fn test_panicking_start_leaves_handle_usable() {
    let log = call_log();
    let reedb = Reedb::new();
    reedb.attach(MockSubsystem::new("storage", &log)).unwrap();
    reedb.attach(MockSubsystem::new("transport", &log).panicking_start()).unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| {
        reedb.initialize(valid_config(OperatingSystem::Linux), None)
    }));
    assert!(result.is_err());
    assert!(!reedb.is_active());

    // Storage was left running by the panic and is stopped before restarting.
    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();
    assert!(reedb.is_active());
    reedb.terminate("done").unwrap();
    assert!(!reedb.is_active());

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "start storage os=Some(Linux)".to_string(),
            "start transport os=Some(Linux)".to_string(),
            "stop storage".to_string(),
            "start storage os=Some(Linux)".to_string(),
            "start transport os=Some(Linux)".to_string(),
            "stop transport".to_string(),
            "stop storage".to_string(),
        ]
    );
}

#[test]
fn test_panicking_stop_leaves_handle_usable() {
    let log = call_log();
    let reedb = Reedb::new();
    reedb.attach(MockSubsystem::new("storage", &log)).unwrap();
    reedb.attach(MockSubsystem::new("transport", &log).panicking_stop()).unwrap();

    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();
    let result = catch_unwind(AssertUnwindSafe(|| reedb.terminate("first")));
    assert!(result.is_err());
    assert!(reedb.is_active());

    // The second terminate stops what the first one didn't reach.
    reedb.terminate("second").unwrap();
    assert!(!reedb.is_active());

    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();
    reedb.terminate("done").unwrap();

    assert_eq!(
        log.lock().unwrap()[..4],
        [
            "start storage os=Some(Linux)".to_string(),
            "start transport os=Some(Linux)".to_string(),
            "stop transport".to_string(),
            "stop storage".to_string(),
        ]
    );
    assert_eq!(log.lock().unwrap().len(), 8);
}

#[test]
fn test_unsupplied_fields_keep_defaults() {
    for os in [OperatingSystem::Linux, OperatingSystem::MacOs, OperatingSystem::Windows] {
        let reedb = Reedb::new();
        reedb.initialize(valid_config(os), None).unwrap();

        let snap = reedb.snapshot();
        assert!(!snap.verbose);
        assert!(snap.daemon);
        assert!(!snap.no_token);
        assert_eq!(snap.tunables.log_state, LogState::Normal);
        reedb.terminate("done").unwrap();
    }
}

#[test]
fn test_reinitialize_reflects_only_second_config() {
    let reedb = Reedb::new();
    let first = LaunchConfig::new(OperatingSystem::Linux, 10)
        .with_verbose(true)
        .with_operational_path("/srv/first")
        .with_override("global_timeout=30");
    reedb.initialize(first, None).unwrap();
    let first_id = reedb.snapshot().instance_id;
    reedb.terminate("switching config").unwrap();

    let second = LaunchConfig::new(OperatingSystem::Windows, 6).with_operational_path("/srv/second");
    reedb.initialize(second, None).unwrap();

    let snap = reedb.snapshot();
    assert_eq!(snap.operating_system, Some(OperatingSystem::Windows));
    assert_eq!(snap.password_min_length, 6);
    assert!(!snap.verbose);
    assert_eq!(snap.operational_path, Some("/srv/second".into()));
    assert_eq!(snap.tunables.global_timeout, reedb::config::schema::DEFAULT_GLOBAL_TIMEOUT);
    assert_ne!(snap.instance_id, first_id);
    reedb.terminate("done").unwrap();
}

#[test]
fn test_required_fields_alone_initialize_on_every_os() {
    for os in [
        OperatingSystem::Linux,
        OperatingSystem::MacOs,
        OperatingSystem::Windows,
        OperatingSystem::Android,
        OperatingSystem::Ios,
        OperatingSystem::Bsd,
    ] {
        let reedb = Reedb::new();
        reedb.initialize(LaunchConfig::new(os, 4), None).unwrap();
        assert!(reedb.is_active(), "{}", os);
        assert_eq!(reedb.operating_system(), Some(os));
        reedb.terminate("done").unwrap();
    }
}

#[test]
fn test_mobile_operational_path_needs_container() {
    let reedb = Reedb::new();
    reedb.initialize(LaunchConfig::new(OperatingSystem::Ios, 6), None).unwrap();
    let err = reedb.config_store().operational_path().unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingContainer);
    reedb.terminate("done").unwrap();

    let config = LaunchConfig::new(OperatingSystem::Android, 6).with_operational_path("/data/user/0/reedb");
    reedb.initialize(config, None).unwrap();
    assert_eq!(
        reedb.config_store().operational_path().unwrap(),
        std::path::PathBuf::from("/data/user/0/reedb")
    );
    reedb.terminate("done").unwrap();
}

#[test]
fn test_concurrent_initialize_admits_one() {
    let reedb = Reedb::new();
    let winners = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let reedb = reedb.clone();
            let winners = winners.clone();
            std::thread::spawn(move || match reedb.initialize(valid_config(OperatingSystem::Linux), None) {
                Ok(()) => {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => assert_eq!(e.code(), ErrorCode::AlreadyInitialised),
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    reedb.terminate("done").unwrap();
}

#[test]
fn test_store_changes_visible_through_handle() {
    let reedb = Reedb::new();
    reedb.initialize(valid_config(OperatingSystem::Linux), None).unwrap();

    let store = reedb.config_store();
    store.set_global_timeout(Duration::from_secs(120)).unwrap();
    store.set_log_state(LogState::Verbose).unwrap();

    let snap = reedb.snapshot();
    assert_eq!(snap.tunables.global_timeout, Duration::from_secs(120));
    assert_eq!(snap.tunables.log_state, LogState::Verbose);
    // Verbose launch flag is separate from the runtime log state.
    assert!(!snap.verbose);
    reedb.terminate("done").unwrap();
}

#[test]
fn test_task_can_read_state_after_initialize() {
    let reedb = Reedb::new();
    let saw_active = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let handle = reedb.clone();
    let flag = saw_active.clone();
    let task = UserTask::new(move |_ctx| {
        flag.store(handle.is_active(), Ordering::SeqCst);
        tx.send(()).unwrap();
    });

    reedb
        .initialize(valid_config(OperatingSystem::Linux).with_daemon(false), Some(task))
        .unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(saw_active.load(Ordering::SeqCst));
    reedb.terminate("done").unwrap();
}
