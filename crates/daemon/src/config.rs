// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: paths and the tunables named in §5/§B (heartbeat
//! interval, stale threshold, graceful-stop timeout, clock-drift buffer,
//! recovery budget). Loaded from environment variables with
//! `dirs`-resolved defaults, mirroring the teacher's own `env`/`lifecycle::Config`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Protocol/version string reported by `healthCheck` (§C.2).
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory (set OJ_STATE_DIR or HOME)")]
    NoStateDir,
}

/// Runner/scheduler tunables, all named explicitly in §5 and §4.6.
#[derive(Debug, Clone, Copy)]
pub struct Tunables {
    pub heartbeat_interval: Duration,
    pub stale_threshold: Duration,
    pub graceful_stop_timeout: Duration,
    pub repository_timeout: Duration,
    pub recovery_budget: Duration,
    pub clock_drift_buffer: Duration,
    pub startup_jitter_max: Duration,
    pub max_restarts: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(10 * 60),
            graceful_stop_timeout: Duration::from_secs(10),
            repository_timeout: Duration::from_secs(5),
            recovery_budget: Duration::from_secs(30),
            clock_drift_buffer: Duration::from_secs(1),
            startup_jitter_max: Duration::from_secs(5),
            max_restarts: oj_core::ContainerType::DEFAULT_MAX_RESTARTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/oj`).
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub store_dir: PathBuf,
    pub log_path: PathBuf,
    pub tunables: Tunables,
}

impl Config {
    /// Load configuration for the user-level daemon, under
    /// `OJ_STATE_DIR` / `XDG_STATE_HOME/oj` / `~/.local/state/oj`.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            store_dir: state_dir.join("store"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
            tunables: Tunables::default(),
        })
    }
}

fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("OJ_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("oj"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/oj"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
