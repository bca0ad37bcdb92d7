// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box end-to-end scenarios (spec.md §8) run against the real `ojd`
//! and `oj` binaries: no business-command crate is linked into this
//! workspace, so these cover what's reachable without one — the RPC
//! surface's create/list/get/stop/logs/health behavior and unknown-id
//! handling.
//!
//! What's deliberately NOT attempted here: with an empty
//! `CommandFactoryRegistry` and no business commands linked in, every
//! container's execution loop finalizes to `FAILED` (`unknown_command_type`)
//! within one scheduler tick of `start()` returning — there's no way for a
//! black-box test spawning separate `oj` processes to race a second create
//! call against the first container while it's still `ACTIVE`. Singleton
//! collapse (P4), full happy-path execution (P1-P3, B1-B3), and crash
//! recovery (P5, P6) are covered white-box instead, in `oj-daemon`'s own
//! `server_tests.rs`/`recovery_tests.rs`/`stale_tests.rs`/`runner_tests.rs`,
//! where a `FakeMediator`/`FakeCommandFactory` stands in for the business
//! commands this workspace doesn't implement.

use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

struct Daemon {
    child: Child,
    _state_dir: TempDir,
    socket_path: PathBuf,
}

impl Daemon {
    fn start() -> Self {
        let state_dir = TempDir::new().expect("tempdir");
        let socket_path = state_dir.path().join("daemon.sock");

        let child = StdCommand::new(assert_cmd::cargo::cargo_bin("ojd"))
            .env("OJ_STATE_DIR", state_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn ojd");

        wait_for_socket(&socket_path);
        Self { child, _state_dir: state_dir, socket_path }
    }

    fn oj(&self) -> Command {
        let mut cmd = Command::cargo_bin("oj").expect("oj binary built");
        cmd.arg("--socket").arg(&self.socket_path);
        cmd
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_for_socket(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !path.exists() {
        if Instant::now() > deadline {
            panic!("daemon socket never appeared at {}", path.display());
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
#[serial(daemon)]
fn health_check_reports_a_fresh_daemon_with_no_active_containers() {
    let daemon = Daemon::start();

    daemon
        .oj()
        .args(["--json", "health"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"active_container_count\": 0"));
}

#[test]
#[serial(daemon)]
fn creating_a_container_makes_it_visible_through_list_and_get() {
    let daemon = Daemon::start();

    let create = daemon
        .oj()
        .args(["--json", "create", "navigate", "--player-id", "7", "--config", "{\"destination\":\"X1-AB\"}"])
        .assert()
        .success();
    let stdout = String::from_utf8(create.get_output().stdout.clone()).expect("utf8");
    let response: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    let container_id = response["container_id"].as_str().expect("container_id").to_string();
    assert!(!container_id.is_empty());

    daemon
        .oj()
        .args(["--json", "list", "--player-id", "7"])
        .assert()
        .success()
        .stdout(predicates::str::contains(container_id.as_str()));

    daemon.oj().args(["--json", "get", &container_id]).assert().success().stdout(
        predicates::str::contains(container_id.as_str()).and(predicates::str::contains("\"container_type\": \"navigate\"")),
    );
}

#[test]
#[serial(daemon)]
fn getting_an_unknown_container_id_reports_no_such_container_without_an_error() {
    let daemon = Daemon::start();

    daemon
        .oj()
        .args(["get", "navigate-ffffffff-1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("no such container"));
}

#[test]
#[serial(daemon)]
fn stopping_an_unknown_container_id_is_an_error() {
    let daemon = Daemon::start();

    daemon
        .oj()
        .args(["stop", "navigate-ffffffff-1"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("navigate-ffffffff-1"));
}

#[test]
#[serial(daemon)]
fn logs_for_an_unknown_container_id_is_an_empty_list_not_an_error() {
    let daemon = Daemon::start();

    daemon.oj().args(["--json", "logs", "navigate-ffffffff-1"]).assert().success().stdout(
        predicates::str::contains("\"entries\": []"),
    );
}
