// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write as _;

use fs2::FileExt;
use oj_core::SystemClock;
use tempfile::TempDir;

use super::*;
use crate::config::Tunables;

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        state_dir: dir.to_path_buf(),
        socket_path: dir.join("daemon.sock"),
        lock_path: dir.join("daemon.pid"),
        version_path: dir.join("daemon.version"),
        store_dir: dir.join("store"),
        log_path: dir.join("daemon.log"),
        tunables: Tunables::default(),
    }
}

#[tokio::test]
async fn start_then_shutdown_creates_and_removes_the_expected_files() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let daemon = start(config.clone(), SystemClock).await.unwrap();
    assert!(config.socket_path.exists(), "socket should be bound after start()");
    assert!(config.version_path.exists(), "version file should be written after start()");
    assert!(config.lock_path.exists(), "lock file should be written after start()");

    daemon.shutdown().await;

    assert!(!config.socket_path.exists(), "socket must be removed on shutdown");
    assert!(!config.version_path.exists(), "version file must be removed on shutdown");
    assert!(config.lock_path.exists(), "lock file is reused by the next start() and must survive shutdown");
}

#[tokio::test]
async fn start_fails_with_lock_failed_when_the_directory_is_already_locked() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    // Simulate a running daemon: hold the lock and leave its files in place.
    std::fs::write(&config.socket_path, b"").unwrap();
    std::fs::write(&config.version_path, crate::config::PROTOCOL_VERSION).unwrap();
    let held_lock = std::fs::OpenOptions::new().create(true).write(true).open(&config.lock_path).unwrap();
    held_lock.try_lock_exclusive().unwrap();
    writeln!(&held_lock, "12345").unwrap();

    match start(config.clone(), SystemClock).await {
        Err(LifecycleError::LockFailed(_)) => {}
        Err(e) => panic!("expected LockFailed, got: {e}"),
        Ok(_) => panic!("expected LockFailed, but start() succeeded"),
    }

    assert!(config.socket_path.exists(), "a LockFailed start must not touch the running daemon's socket");
    assert!(config.version_path.exists(), "a LockFailed start must not touch the running daemon's version file");
    assert_eq!(std::fs::read_to_string(&config.lock_path).unwrap().trim(), "12345");
}

#[test]
fn cleanup_on_failure_removes_version_and_socket_but_leaves_the_lock_file() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(&config.socket_path, b"").unwrap();
    std::fs::write(&config.version_path, b"0.2.0").unwrap();
    std::fs::write(&config.lock_path, b"12345").unwrap();

    cleanup_on_failure(&config);

    assert!(!config.socket_path.exists());
    assert!(!config.version_path.exists());
    assert!(config.lock_path.exists(), "cleanup_on_failure never owns the lock file's lifecycle");
}

#[test]
fn acquire_lock_does_not_truncate_an_existing_pid_before_the_lock_is_confirmed_held() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    let held_lock = std::fs::OpenOptions::new().create(true).write(true).open(&config.lock_path).unwrap();
    held_lock.try_lock_exclusive().unwrap();
    writeln!(&held_lock, "99999").unwrap();

    let err = acquire_lock(&config).unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert_eq!(
        std::fs::read_to_string(&config.lock_path).unwrap().trim(),
        "99999",
        "a failed lock attempt must not truncate the holder's pid"
    );
}
