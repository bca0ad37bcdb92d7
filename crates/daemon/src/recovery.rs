// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery (§4.4): every row left `RUNNING`/`INTERRUPTED` by a
//! prior daemon instance either resumes under a freshly constructed
//! [`ContainerRunner`] or is marked terminally `FAILED` with a reason
//! explaining why it couldn't.

use std::sync::Arc;

use oj_adapters::{CommandFactoryRegistry, ContainerLogger, Mediator};
use oj_core::{Clock, Container, ExitReason};
use oj_storage::{ContainerRepository, LogRepository, ShipRepository};

use crate::config::Tunables;
use crate::error::RecoveryError;
use crate::runner::ContainerRunner;

/// Startup counts for whoever calls [`recover`] to log: how many rows came
/// back under a resumed runner versus how many were marked terminally
/// failed, broken down by the reason they failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub reconstructed: usize,
    pub failed_unknown_type: usize,
    pub failed_invalid_config: usize,
    pub failed_orphaned_worker: usize,
}

/// Reconstructs and resumes every recoverable row, bounded by
/// `tunables.recovery_budget`. Rows abandoned because the budget ran out
/// are left `RUNNING`/`INTERRUPTED` for the next startup to retry.
#[allow(clippy::too_many_arguments)]
pub async fn recover<C, LR>(
    clock: C,
    container_repo: Arc<dyn ContainerRepository>,
    ship_repo: Arc<dyn ShipRepository>,
    logger: Arc<ContainerLogger<LR>>,
    mediator: Arc<dyn Mediator>,
    factories: Arc<CommandFactoryRegistry>,
    tunables: Tunables,
) -> Result<(Vec<Arc<ContainerRunner<C, LR>>>, RecoverySummary), RecoveryError>
where
    C: Clock + 'static,
    LR: LogRepository + 'static,
{
    let rows = container_repo.list_recoverable();

    // Every reservation a prior instance held is suspect; release them all
    // up front, before deciding which rows actually get to resume.
    for row in &rows {
        for mut ship in ship_repo.list_by_container(&row.id) {
            ship.force_release(ExitReason::daemon_restart(), &clock);
            ship_repo.upsert(ship)?;
        }
    }

    let deadline = clock.now() + tunables.recovery_budget;
    let mut resumed = Vec::new();
    let mut summary = RecoverySummary::default();

    for row in rows {
        if clock.now() >= deadline {
            tracing::warn!(
                container_id = %row.id,
                "recovery budget exhausted, leaving remaining rows for next startup"
            );
            break;
        }

        if let Some(parent_id) = row.parent_container_id {
            let parent_active =
                container_repo.get(&parent_id).map(|parent| parent.status.is_active()).unwrap_or(false);
            if !parent_active {
                fail_row(&container_repo, row, ExitReason::orphaned_worker(), &clock);
                summary.failed_orphaned_worker += 1;
                continue;
            }
        }

        match factories.build(&row.command_type, row.player_id, &row.config) {
            None => {
                fail_row(&container_repo, row, ExitReason::unknown_command_type(&row.command_type), &clock);
                summary.failed_unknown_type += 1;
                continue;
            }
            Some(Err(e)) => {
                fail_row(&container_repo, row, ExitReason::invalid_config(e), &clock);
                summary.failed_invalid_config += 1;
                continue;
            }
            Some(Ok(_)) => {}
        }

        let runner = ContainerRunner::new(
            row.id,
            row.player_id,
            row.command_type.clone(),
            clock.clone(),
            container_repo.clone(),
            ship_repo.clone(),
            logger.clone(),
            mediator.clone(),
            factories.clone(),
            tunables.clone(),
        );

        match runner.resume().await {
            Ok(()) => {
                resumed.push(runner);
                summary.reconstructed += 1;
            }
            Err(e) => {
                tracing::warn!(container_id = %row.id, error = %e, "failed to resume container");
                fail_row(&container_repo, row, ExitReason::recovery_failed(e), &clock);
                summary.failed_invalid_config += 1;
            }
        }
    }

    Ok((resumed, summary))
}

/// Normalizes `row` to `RUNNING` (a no-op if it already is) so `fail()`'s
/// single-origin precondition applies uniformly to both recoverable
/// statuses, then marks it terminally `FAILED`.
fn fail_row(container_repo: &Arc<dyn ContainerRepository>, mut row: Container, reason: ExitReason, clock: &impl Clock) {
    if row.resume(clock).is_err() {
        return;
    }
    if row.fail(reason, clock).is_err() {
        return;
    }
    if let Err(e) = container_repo.update(row) {
        tracing::warn!(error = %e, "failed to persist recovery failure");
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
