// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and shutdown orchestration (§4.3, §C.1).
//!
//! Ordering on startup matters: the lock file is opened and held *before*
//! anything else touches `state_dir`, so a second `ojd` invocation fails
//! fast on `LockFailed` rather than racing the first instance's WAL. The
//! Unix socket is bound last, after recovery has finished, so a client
//! connecting the instant the socket appears never sees a daemon that's
//! still mid-recovery.
//!
//! `DurableStore` owns its own WAL/snapshot durability (unlike the
//! teacher's `lifecycle` module, which coordinates a separate event bus and
//! checkpointer), so there's nothing here to wire up beyond `open()` and
//! `shutdown()`.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::Arc;

use fs2::FileExt;
use oj_adapters::{CommandFactoryRegistry, ContainerLogger, Mediator, NullMediator};
use oj_core::Clock;
use oj_storage::DurableStore;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::LifecycleError;
use crate::listener::Listener;
use crate::scheduler::Scheduler;
use crate::server::DaemonServer;
use crate::stale::StaleDetector;

/// Everything a running daemon needs released in `shutdown()`.
pub struct Daemon<C> {
    pub server: Arc<DaemonServer<C, DurableStore>>,
    pub scheduler: Arc<Scheduler<C>>,
    store: Arc<DurableStore>,
    _lock_file: File,
    config: Config,
    cancel: CancellationToken,
    background: Vec<tokio::task::JoinHandle<()>>,
}

/// Acquires the lock, opens the durable store, recovers prior containers,
/// reschedules pending ship timers, and finally binds the Unix socket.
///
/// No business-command crate is linked into this binary, so the mediator
/// always reports `NoHandler` and the factory registry starts empty —
/// recovery marks any row whose `command_type` isn't registered
/// `unknown_command_type` rather than resurrecting it (§4.4).
pub async fn start<C>(config: Config, clock: C) -> Result<Daemon<C>, LifecycleError>
where
    C: Clock + 'static,
{
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.store_dir)?;

    let lock_file = acquire_lock(&config)?;
    write_version_file(&config)?;

    let result = start_inner(&config, clock).await;
    if result.is_err() {
        cleanup_on_failure(&config);
    }
    result.map(|(server, scheduler, store, cancel, background)| Daemon {
        server,
        scheduler,
        store,
        _lock_file: lock_file,
        config,
        cancel,
        background,
    })
}

#[allow(clippy::type_complexity)]
async fn start_inner<C>(
    config: &Config,
    clock: C,
) -> Result<
    (
        Arc<DaemonServer<C, DurableStore>>,
        Arc<Scheduler<C>>,
        Arc<DurableStore>,
        CancellationToken,
        Vec<tokio::task::JoinHandle<()>>,
    ),
    LifecycleError,
>
where
    C: Clock + 'static,
{
    let store = Arc::new(DurableStore::open(&config.store_dir)?);
    let logger = Arc::new(ContainerLogger::new(store.clone()));
    let mediator: Arc<dyn Mediator> = Arc::new(NullMediator);
    let factories = Arc::new(CommandFactoryRegistry::new());

    let container_repo = store.clone() as Arc<dyn oj_storage::ContainerRepository>;
    let ship_repo = store.clone() as Arc<dyn oj_storage::ShipRepository>;

    let server = DaemonServer::new(
        clock.clone(),
        container_repo.clone(),
        ship_repo.clone(),
        logger.clone(),
        mediator.clone(),
        factories.clone(),
        config.tunables,
        None,
    );

    let (resumed, summary) = crate::recovery::recover(
        clock.clone(),
        container_repo.clone(),
        ship_repo.clone(),
        logger.clone(),
        mediator,
        factories,
        config.tunables,
    )
    .await?;
    tracing::info!(
        reconstructed = summary.reconstructed,
        failed_unknown_type = summary.failed_unknown_type,
        failed_invalid_config = summary.failed_invalid_config,
        failed_orphaned_worker = summary.failed_orphaned_worker,
        "recovered prior containers on startup"
    );
    for runner in resumed {
        server.register_recovered(runner);
    }

    let scheduler = Scheduler::new(clock.clone(), ship_repo.clone(), config.tunables.clock_drift_buffer);
    scheduler.schedule_all_pending();

    let cancel = CancellationToken::new();
    let mut background = Vec::new();

    let stale = StaleDetector::new(clock.clone(), container_repo, ship_repo, config.tunables);
    background.push(stale.spawn(cancel.clone()));

    let unix = bind_socket(&config.socket_path)?;
    let listener = Listener::new(unix, server.clone());
    let listener_cancel = cancel.clone();
    background.push(tokio::spawn(async move { listener.run(listener_cancel).await }));

    Ok((server, scheduler, store, cancel, background))
}

impl<C> Daemon<C>
where
    C: Clock + 'static,
{
    /// §4.3's shutdown sequence: stop accepting connections, interrupt every
    /// runner, drain the scheduler's timers, checkpoint the store, then
    /// remove the files a fresh `start()` would otherwise trip over.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.background {
            let _ = task.await;
        }
        self.server.shutdown().await;
        self.scheduler.cancel_all();
        if let Err(e) = self.store.shutdown() {
            tracing::error!(error = %e, "failed to checkpoint store on shutdown");
        }

        let _ = std::fs::remove_file(&self.config.socket_path);
        let _ = std::fs::remove_file(&self.config.version_path);
        // The lock file itself is left in place; `_lock_file`'s drop
        // releases the `flock` and the next `start()` reuses the same path.
    }
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    // `truncate(false)`: if another instance holds the lock, this call must
    // not wipe a running daemon's PID before `try_lock_exclusive` fails.
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .mode(0o600)
        .open(&config.lock_path)?;
    file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    file.set_len(0)?;
    let mut file = file;
    writeln!(file, "{}", std::process::id())?;
    file.sync_all()?;
    Ok(file)
}

fn write_version_file(config: &Config) -> Result<(), LifecycleError> {
    std::fs::write(&config.version_path, crate::config::PROTOCOL_VERSION)?;
    Ok(())
}

fn bind_socket(path: &std::path::Path) -> Result<UnixListener, LifecycleError> {
    let _ = std::fs::remove_file(path);
    UnixListener::bind(path).map_err(|e| LifecycleError::BindFailed(path.to_path_buf(), e))
}

/// Never deletes a lock file belonging to an already-running daemon — a
/// `LockFailed` startup error means this process never actually owns
/// `state_dir`'s contents.
fn cleanup_on_failure(config: &Config) {
    let _ = std::fs::remove_file(&config.version_path);
    let _ = std::fs::remove_file(&config.socket_path);
}

#[cfg(test)]
#[path = "lifecycle_rs_tests.rs"]
mod tests;
