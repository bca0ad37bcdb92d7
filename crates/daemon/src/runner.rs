// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ContainerRunner`: the per-container supervisor (§4.2). Runs exactly one
//! container entity end-to-end — executes its command through the
//! mediator, enforces iteration/retry policy, publishes heartbeats,
//! persists state transitions, and owns cancellation and ship reservation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use oj_adapters::{
    Command, CommandFactoryRegistry, ContainerLogContext, ContainerLogger, EventPublisher, Mediator,
    WorkerCompletedEvent,
};
use oj_core::{Clock, ContainerId, ExitReason, LogLevel, PlayerId, ShipSymbol};
use oj_storage::{ContainerRepository, LogRepository, ShipRepository};
use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Tunables;
use crate::error::RunnerError;

/// Which terminal transition a cancelled execution task should apply once it
/// observes `cancel.is_cancelled()`. Set by whichever public method
/// requested the cancellation, read once by the execution task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingExit {
    /// `stop()` was called: STOPPING then STOPPED.
    Stopped,
    /// daemon shutdown: directly INTERRUPTED.
    Interrupted,
}

struct RunnerTasks {
    execution: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// Runs one container's command to completion. Constructed already bound to
/// a persisted `PENDING` row; `start()` drives it to `RUNNING` and beyond.
pub struct ContainerRunner<C, LR> {
    id: ContainerId,
    player_id: PlayerId,
    command_type: String,
    clock: C,
    container_repo: Arc<dyn ContainerRepository>,
    ship_repo: Arc<dyn ShipRepository>,
    logger: Arc<ContainerLogger<LR>>,
    mediator: Arc<dyn Mediator>,
    factories: Arc<CommandFactoryRegistry>,
    tunables: Tunables,
    cancel: CancellationToken,
    publisher: Mutex<Option<Arc<dyn EventPublisher>>>,
    first_command: Mutex<Option<Command>>,
    pending_exit: Mutex<Option<PendingExit>>,
    tasks: Mutex<Option<RunnerTasks>>,
    started: AtomicBool,
}

impl<C, LR> ContainerRunner<C, LR>
where
    C: Clock + 'static,
    LR: LogRepository + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ContainerId,
        player_id: PlayerId,
        command_type: impl Into<String>,
        clock: C,
        container_repo: Arc<dyn ContainerRepository>,
        ship_repo: Arc<dyn ShipRepository>,
        logger: Arc<ContainerLogger<LR>>,
        mediator: Arc<dyn Mediator>,
        factories: Arc<CommandFactoryRegistry>,
        tunables: Tunables,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            player_id,
            command_type: command_type.into(),
            clock,
            container_repo,
            ship_repo,
            logger,
            mediator,
            factories,
            tunables,
            cancel: CancellationToken::new(),
            publisher: Mutex::new(None),
            first_command: Mutex::new(None),
            pending_exit: Mutex::new(None),
            tasks: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Optional: if set, publishes a [`WorkerCompletedEvent`] on terminal exit.
    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.publisher.lock() = Some(publisher);
    }

    /// Stashes a pre-built command for the very first dispatch, bypassing
    /// factory reconstruction once. Used by the persist/start worker split
    /// (§4.3) to preserve in-process state a fresh `factories.build()` off
    /// the persisted `config` couldn't recover. Must be called before
    /// `start()`/`resume()`.
    pub fn set_first_command(&self, command: Command) {
        *self.first_command.lock() = Some(command);
    }

    /// `getLogs(limit?, level?)`.
    pub fn get_logs(&self, limit: usize, min_level: Option<LogLevel>) -> Vec<oj_core::LogEntry> {
        self.logger.tail(&self.id, limit, min_level)
    }

    /// Idempotent if called twice against the same entity. Returns once
    /// status is `RUNNING` and background work is scheduled.
    pub async fn start(self: &Arc<Self>) -> Result<(), RunnerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut container =
            self.container_repo.get(&self.id).ok_or(RunnerError::MissingContainer(self.id))?;

        container.start(&self.clock)?;

        // Reserve the ship (if any) before persisting RUNNING, so a failure
        // here leaves the row at its prior status with no partial effects.
        if let Some(ship_symbol) = configured_ship_symbol(&container.config) {
            self.reserve_ship(ship_symbol)?;
        }

        self.container_repo.update(container)?;

        let heartbeat = tokio::spawn(Self::heartbeat_loop(self.clone()));
        let execution = tokio::spawn(Self::execution_loop(self.clone()));
        *self.tasks.lock() = Some(RunnerTasks { execution, heartbeat });

        Ok(())
    }

    /// Recovery's counterpart to `start()`: reconstructs a runner for a row
    /// already `RUNNING` or `INTERRUPTED` from a prior daemon instance,
    /// re-acquiring its ship reservation idempotently rather than requiring
    /// a fresh `PENDING` row.
    pub async fn resume(self: &Arc<Self>) -> Result<(), RunnerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut container =
            self.container_repo.get(&self.id).ok_or(RunnerError::MissingContainer(self.id))?;

        container.resume(&self.clock)?;

        if let Some(ship_symbol) = configured_ship_symbol(&container.config) {
            self.reserve_ship(ship_symbol)?;
        }

        self.container_repo.update(container)?;

        let heartbeat = tokio::spawn(Self::heartbeat_loop(self.clone()));
        let execution = tokio::spawn(Self::execution_loop(self.clone()));
        *self.tasks.lock() = Some(RunnerTasks { execution, heartbeat });

        Ok(())
    }

    fn reserve_ship(&self, ship_symbol: ShipSymbol) -> Result<(), RunnerError> {
        let mut ship = self.ship_repo.get(&ship_symbol).ok_or(RunnerError::UnknownShip(ship_symbol))?;
        ship.assign_to_container(self.id, &self.clock).map_err(|_| {
            RunnerError::ReservationConflict(ship_symbol)
        })?;
        self.ship_repo.upsert(ship)?;
        Ok(())
    }

    fn release_ships(&self, reason: ExitReason) {
        for mut ship in self.ship_repo.list_by_container(&self.id) {
            ship.force_release(reason.clone(), &self.clock);
            if let Err(e) = self.ship_repo.upsert(ship) {
                tracing::warn!(container_id = %self.id, error = %e, "failed to persist ship release");
            }
        }
    }

    async fn publish_completion(&self, success: bool, error: Option<String>, ship_symbol: Option<ShipSymbol>) {
        let Some(publisher) = self.publisher.lock().clone() else { return };
        let coordinator_id = self.container_repo.get(&self.id).and_then(|c| c.parent_container_id);
        publisher
            .publish(WorkerCompletedEvent {
                container_id: self.id,
                player_id: self.player_id,
                ship_symbol,
                coordinator_id,
                success,
                error,
            })
            .await;
    }

    /// Must be called before [`Self::release_ships`] — `force_release` clears
    /// a ship's `container_id`, so `list_by_container` would return nothing
    /// once it's run.
    fn reserved_ship_symbol(&self) -> Option<ShipSymbol> {
        self.ship_repo.list_by_container(&self.id).first().map(|s| s.ship_symbol)
    }

    /// `stop()` — cancels work, waits up to `GracefulStopTimeout` for the
    /// background task to exit, forcibly marks `STOPPED` if it elapses, then
    /// releases reservations.
    pub async fn stop(&self) -> Result<(), RunnerError> {
        self.request_exit(PendingExit::Stopped).await
    }

    /// Daemon-shutdown variant: directly `INTERRUPTED` rather than `STOPPED`.
    pub async fn interrupt(&self) -> Result<(), RunnerError> {
        self.request_exit(PendingExit::Interrupted).await
    }

    async fn request_exit(&self, kind: PendingExit) -> Result<(), RunnerError> {
        *self.pending_exit.lock() = Some(kind);
        self.cancel.cancel();

        let tasks = self.tasks.lock().take();
        let Some(tasks) = tasks else { return self.force_finalize(kind) };

        let timeout = self.tunables.graceful_stop_timeout;
        let joined = tokio::time::timeout(timeout, async {
            let _ = tasks.execution.await;
            tasks.heartbeat.abort();
        })
        .await;

        if joined.is_err() {
            tracing::warn!(container_id = %self.id, "graceful stop timed out, forcing terminal state");
            tasks.heartbeat.abort();
            return self.force_finalize(kind);
        }

        Ok(())
    }

    /// Used both when the execution task never started (race with `stop()`
    /// before `start()`) and when it fails to exit within the timeout.
    fn force_finalize(&self, kind: PendingExit) -> Result<(), RunnerError> {
        let Some(mut container) = self.container_repo.get(&self.id) else { return Ok(()) };
        match kind {
            PendingExit::Stopped => {
                container.stop(&self.clock)?;
                if container.mark_stopped(&self.clock).is_err() {
                    // already STOPPED/terminal by a race with the execution task.
                    return Ok(());
                }
            }
            PendingExit::Interrupted => {
                if container.interrupt(&self.clock).is_err() {
                    return Ok(());
                }
            }
        }
        self.container_repo.update(container)?;
        self.release_ships(ExitReason::daemon_shutdown());
        Ok(())
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.tunables.heartbeat_interval) => {}
            }
            let Some(mut container) = self.container_repo.get(&self.id) else { return };
            container.record_heartbeat(&self.clock);
            if let Err(e) = self.container_repo.update(container) {
                tracing::warn!(container_id = %self.id, error = %e, "failed to persist heartbeat");
            }
        }
    }

    async fn execution_loop(self: Arc<Self>) {
        let jitter_max = self.tunables.startup_jitter_max.as_secs_f64();
        if jitter_max > 0.0 {
            let jitter = rand::rng().random::<f64>() * jitter_max;
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(std::time::Duration::from_secs_f64(jitter)) => {}
            }
        }

        loop {
            if self.cancel.is_cancelled() {
                self.finish_cancelled().await;
                return;
            }

            let Some(container) = self.container_repo.get(&self.id) else { return };
            if !container.status.is_active() {
                return;
            }
            if container.max_iterations >= 0 && container.current_iteration >= container.max_iterations {
                self.finish_completed().await;
                return;
            }

            let stashed = self.first_command.lock().take();
            let command = match stashed {
                Some(command) => command,
                None => match self.factories.build(&self.command_type, self.player_id, &container.config) {
                    None => {
                        self.finish_failed(ExitReason::unknown_command_type(&self.command_type)).await;
                        return;
                    }
                    Some(Err(e)) => {
                        self.finish_failed(ExitReason::invalid_config(e)).await;
                        return;
                    }
                    Some(Ok(command)) => command,
                },
            };

            let log_ctx = ContainerLogContext::new(self.logger.clone(), self.clock.clone(), self.id, self.player_id);
            match self.mediator.send(&self.cancel, command, &log_ctx).await {
                Ok(_response) => {
                    let Some(mut container) = self.container_repo.get(&self.id) else { return };
                    let outcome = container.increment_iteration(&self.clock);
                    if let Err(e) = self.container_repo.update(container) {
                        tracing::warn!(container_id = %self.id, error = %e, "failed to persist iteration");
                    }
                    if outcome == oj_core::IterationOutcome::ReachedLimit {
                        self.finish_completed().await;
                        return;
                    }
                }
                Err(e) if self.cancel.is_cancelled() => {
                    let _ = e;
                    self.finish_cancelled().await;
                    return;
                }
                Err(e) => {
                    if self.fail_and_maybe_retry(&e).await {
                        continue;
                    }
                    return;
                }
            }
        }
    }

    /// Records the failed attempt and decides whether to retry. Returns
    /// `true` if the loop should continue (retryable), `false` if it has
    /// already finalized the container as terminally `FAILED`.
    async fn fail_and_maybe_retry(&self, error: &oj_adapters::MediatorError) -> bool {
        let Some(mut container) = self.container_repo.get(&self.id) else { return false };
        let reason = ExitReason::new("command_execution_failed", error);
        if let Err(e) = container.fail(reason, &self.clock) {
            tracing::warn!(container_id = %self.id, error = %e, "failed to record failed attempt");
            return false;
        }

        if container.can_restart(self.tunables.max_restarts) {
            container.record_restart();
            if let Err(e) = container.reset(&self.clock) {
                tracing::warn!(container_id = %self.id, error = %e, "failed to reset for retry");
                return false;
            }
            // reset() leaves the row at PENDING; immediately re-enter RUNNING
            // since the execution loop keeps going without a fresh start().
            if let Err(e) = container.start(&self.clock) {
                tracing::warn!(container_id = %self.id, error = %e, "failed to resume after retry reset");
                return false;
            }
            if let Err(e) = self.container_repo.update(container) {
                tracing::warn!(container_id = %self.id, error = %e, "failed to persist retry reset");
            }
            true
        } else {
            if let Err(e) = self.container_repo.update(container) {
                tracing::warn!(container_id = %self.id, error = %e, "failed to persist terminal failure");
            }
            let ship_symbol = self.reserved_ship_symbol();
            self.release_ships(ExitReason::new("command_execution_failed", error));
            self.publish_completion(false, Some(error.to_string()), ship_symbol).await;
            false
        }
    }

    async fn finish_completed(&self) {
        if let Some(mut container) = self.container_repo.get(&self.id) {
            if container.complete(&self.clock).is_ok() {
                if let Err(e) = self.container_repo.update(container) {
                    tracing::warn!(container_id = %self.id, error = %e, "failed to persist completion");
                }
            }
        }
        self.logger.log(self.id, self.player_id, self.clock.epoch_ms(), LogLevel::Info, "Container completed successfully");
        let ship_symbol = self.reserved_ship_symbol();
        self.release_ships(ExitReason::token_only("completed"));
        self.publish_completion(true, None, ship_symbol).await;
    }

    async fn finish_failed(&self, reason: ExitReason) {
        if let Some(mut container) = self.container_repo.get(&self.id) {
            let message = reason.to_string();
            if container.fail(reason, &self.clock).is_ok() {
                if let Err(e) = self.container_repo.update(container) {
                    tracing::warn!(container_id = %self.id, error = %e, "failed to persist failure");
                }
            }
            self.logger.log(self.id, self.player_id, self.clock.epoch_ms(), LogLevel::Error, message.clone());
            let ship_symbol = self.reserved_ship_symbol();
            self.release_ships(ExitReason::token_only("unrecoverable"));
            self.publish_completion(false, Some(message), ship_symbol).await;
        }
    }

    async fn finish_cancelled(&self) {
        let kind = (*self.pending_exit.lock()).unwrap_or(PendingExit::Stopped);
        let ship_symbol = self.reserved_ship_symbol();
        let _ = self.force_finalize(kind);
        self.publish_completion(false, Some("cancelled".into()), ship_symbol).await;
    }
}

fn configured_ship_symbol(config: &serde_json::Value) -> Option<ShipSymbol> {
    config.get("ship_symbol").and_then(|v| v.as_str()).map(ShipSymbol::new)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
