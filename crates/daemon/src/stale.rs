// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic stale-worker sweep (§4.2, §4.7): a `manufacturing_task_worker`
//! stuck `RUNNING` with no heartbeat in `stale_threshold` almost certainly
//! died without updating its row — likely killed without a chance to run
//! its own shutdown path. The sweep reclaims it independently of any
//! runner still believed to be supervising it.

use std::sync::Arc;
use std::time::Duration;

use oj_core::{ContainerStatus, ContainerType, ExitReason, PlayerId};
use oj_storage::{ContainerFilter, ContainerRepository, ShipRepository};

use crate::config::Tunables;

/// Runs the sweep on a fixed interval until cancelled.
pub struct StaleDetector<C> {
    clock: C,
    container_repo: Arc<dyn ContainerRepository>,
    ship_repo: Arc<dyn ShipRepository>,
    tunables: Tunables,
}

impl<C> StaleDetector<C>
where
    C: oj_core::Clock + 'static,
{
    pub fn new(
        clock: C,
        container_repo: Arc<dyn ContainerRepository>,
        ship_repo: Arc<dyn ShipRepository>,
        tunables: Tunables,
    ) -> Self {
        Self { clock, container_repo, ship_repo, tunables }
    }

    /// Spawns the sweep loop, running once every `stale_threshold / 2` so a
    /// worker is never more than half a threshold late getting reclaimed.
    pub fn spawn(self, cancel: tokio_util::sync::CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let interval = (self.tunables.stale_threshold / 2).max(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                self.sweep();
            }
        })
    }

    /// One pass: scans every `RUNNING` row, reclaims the stale
    /// `manufacturing_task_worker`s among them. Exposed directly for tests
    /// and for an operator-triggered manual sweep.
    pub fn sweep(&self) -> usize {
        let now = self.clock.epoch_ms();
        let threshold_ms = self.tunables.stale_threshold.as_millis() as u64;

        let running = self
            .container_repo
            .list(&ContainerFilter { player_id: None, status: Some(ContainerStatus::Running) });

        let mut reclaimed = 0;
        for mut container in running {
            if container.container_type != ContainerType::ManufacturingTaskWorker {
                continue;
            }
            let last_beat = container.heartbeat_at.unwrap_or(container.started_at.unwrap_or(container.created_at));
            if now.saturating_sub(last_beat) < threshold_ms {
                continue;
            }

            let id = container.id;
            if container.fail(ExitReason::stale_worker(), &self.clock).is_err() {
                continue;
            }
            if let Err(e) = self.container_repo.update(container) {
                tracing::warn!(container_id = %id, error = %e, "failed to persist stale-worker failure");
                continue;
            }
            for mut ship in self.ship_repo.list_by_container(&id) {
                ship.force_release(ExitReason::stale_worker(), &self.clock);
                if let Err(e) = self.ship_repo.upsert(ship) {
                    tracing::warn!(container_id = %id, error = %e, "failed to release ship for stale worker");
                }
            }
            reclaimed += 1;
        }
        reclaimed
    }

    /// The second sweep named in §4.4: when a new `manufacturing_coordinator`
    /// takes over a singleton key, any `manufacturing_task_worker` still
    /// `RUNNING` under this player whose `parent_container_id` no longer
    /// names an active container belonged to the coordinator that just
    /// disappeared. Stop them and release their ships rather than leaving
    /// them to run unsupervised.
    pub fn sweep_orphaned_workers(&self, player_id: PlayerId) -> usize {
        let running = self
            .container_repo
            .list(&ContainerFilter { player_id: Some(player_id), status: Some(ContainerStatus::Running) });

        let mut stopped = 0;
        for mut container in running {
            if container.container_type != ContainerType::ManufacturingTaskWorker {
                continue;
            }
            let Some(parent_id) = container.parent_container_id else { continue };
            let parent_active = self.container_repo.get(&parent_id).is_some_and(|p| p.status.is_active());
            if parent_active {
                continue;
            }

            let id = container.id;
            if container.fail(ExitReason::orphaned_worker(), &self.clock).is_err() {
                continue;
            }
            if let Err(e) = self.container_repo.update(container) {
                tracing::warn!(container_id = %id, error = %e, "failed to persist orphaned-worker failure");
                continue;
            }
            for mut ship in self.ship_repo.list_by_container(&id) {
                ship.force_release(ExitReason::orphaned_worker(), &self.clock);
                if let Err(e) = self.ship_repo.upsert(ship) {
                    tracing::warn!(container_id = %id, error = %e, "failed to release ship for orphaned worker");
                }
            }
            stopped += 1;
        }
        stopped
    }
}

#[cfg(test)]
#[path = "stale_tests.rs"]
mod tests;
