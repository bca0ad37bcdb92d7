// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ojd: the container-orchestration daemon binary.
//!
//! Listens on a Unix socket for `oj` CLI commands and supervises containers
//! in the background. Not meant to be invoked directly by a human outside
//! of `--version`/`--help`.

use oj_core::SystemClock;
use oj_daemon::config::Config;
use oj_daemon::error::LifecycleError;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ojd {}", oj_daemon::config::PROTOCOL_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ojd {}", oj_daemon::config::PROTOCOL_VERSION);
                println!("Container-orchestration daemon — supervises per-player containers");
                println!("and their ship reservations in the background.");
                println!();
                println!("USAGE:");
                println!("    ojd");
                println!();
                println!("ojd is typically started by the `oj` CLI and should not be invoked");
                println!("directly. It listens on a Unix socket for commands from `oj`.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ojd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting ojd");

    let daemon = match oj_daemon::lifecycle::start(config.clone(), SystemClock).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default().trim().to_string();
            let version = std::fs::read_to_string(&config.version_path).unwrap_or_default().trim().to_string();

            eprintln!("ojd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                if version == oj_daemon::config::PROTOCOL_VERSION {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated — current: {})", oj_daemon::config::PROTOCOL_VERSION);
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!(error = %e, "failed to start daemon");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    daemon.shutdown().await;
    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files kept (`daemon.log.1`..`.3`).
const MAX_ROTATED_LOGS: u32 = 3;

/// Shifts `daemon.log` → `.1` → `.2` → `.3`, dropping the oldest.
/// Best-effort: failures don't block startup.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Written before tracing initializes, so the marker is visible to a reader
/// even if the process dies before the non-blocking writer flushes.
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "--- ojd: starting (pid: {}) ---\n", std::process::id())?;
    Ok(())
}

fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {error}");
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let parent = config.log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    std::fs::create_dir_all(parent)?;

    let file_name = config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
