// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DaemonServer` (§4.3): the process-wide runner registry, the external
//! surface `create`/`list`/`get`/`stop` operations are built on, singleton
//! enforcement per logical key, the worker persist/start split, and
//! shutdown orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use oj_adapters::{Command, CommandFactoryRegistry, ContainerLogger, EventPublisher, Mediator};
use oj_core::{Clock, Container, ContainerId, ContainerStatus, ContainerType, PlayerId, SingletonKey};
use oj_storage::{ContainerFilter, ContainerRepository, LogRepository, ShipRepository};
use parking_lot::{Mutex, RwLock};

use crate::config::Tunables;
use crate::error::ServerError;
use crate::runner::ContainerRunner;
use crate::stale::StaleDetector;

/// Everything needed to persist and run a new container, independent of
/// whether it goes through the plain create path or the worker
/// persist/start split.
pub struct CreateRequest {
    pub player_id: PlayerId,
    pub container_type: ContainerType,
    pub command_type: String,
    pub parent_container_id: Option<ContainerId>,
    pub config: serde_json::Value,
    pub max_iterations: i64,
    /// `Some` for container types enforcing a singleton per §4.3's table.
    pub singleton_key: Option<SingletonKey>,
    /// `gas_coordinator`'s singleton check is bypassed entirely for dry-run
    /// creations (§4.3): no conditional insert, no existing-holder lookup,
    /// always persisted fresh.
    pub dry_run: bool,
}

/// Outcome of [`DaemonServer::persist_container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    /// A new row was inserted under this id.
    Created(ContainerId),
    /// No row was inserted; `singleton_key` is already held by this id.
    SingletonHeldBy(ContainerId),
}

pub struct DaemonServer<C, LR> {
    clock: C,
    container_repo: Arc<dyn ContainerRepository>,
    ship_repo: Arc<dyn ShipRepository>,
    logger: Arc<ContainerLogger<LR>>,
    mediator: Arc<dyn Mediator>,
    factories: Arc<CommandFactoryRegistry>,
    tunables: Tunables,
    publisher: Option<Arc<dyn EventPublisher>>,
    runners: RwLock<HashMap<ContainerId, Arc<ContainerRunner<C, LR>>>>,
    /// Commands stashed between `persist_worker` and `start_worker`
    /// (§4.3's worker persistence split).
    pending_worker_commands: Mutex<HashMap<ContainerId, Command>>,
    started_at: Instant,
}

impl<C, LR> DaemonServer<C, LR>
where
    C: Clock + 'static,
    LR: LogRepository + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: C,
        container_repo: Arc<dyn ContainerRepository>,
        ship_repo: Arc<dyn ShipRepository>,
        logger: Arc<ContainerLogger<LR>>,
        mediator: Arc<dyn Mediator>,
        factories: Arc<CommandFactoryRegistry>,
        tunables: Tunables,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            clock,
            container_repo,
            ship_repo,
            logger,
            mediator,
            factories,
            tunables,
            publisher,
            runners: RwLock::new(HashMap::new()),
            pending_worker_commands: Mutex::new(HashMap::new()),
            started_at: Instant::now(),
        })
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Registers an already-recovered runner (from [`crate::recovery::recover`])
    /// without re-persisting or re-starting it.
    pub fn register_recovered(&self, runner: Arc<ContainerRunner<C, LR>>) {
        if let Some(publisher) = &self.publisher {
            runner.set_event_publisher(publisher.clone());
        }
        self.runners.write().insert(runner.id(), runner);
    }

    /// Persists the row, registers a runner, and starts it in one step —
    /// the common path for container types with no persist/start split.
    /// If `req` carries a singleton key already held by an active container,
    /// returns that container's id instead of creating a duplicate.
    pub async fn create_container(self: &Arc<Self>, req: CreateRequest) -> Result<ContainerId, ServerError> {
        match self.persist_container(req)? {
            Persisted::Created(id) => {
                self.start_worker(id).await?;
                Ok(id)
            }
            Persisted::SingletonHeldBy(id) => Ok(id),
        }
    }

    /// Persists a `PENDING` row without starting it, honoring the singleton
    /// check when `req.singleton_key` is set.
    pub fn persist_container(&self, req: CreateRequest) -> Result<Persisted, ServerError> {
        // `<op>-<seed>-<nanos>` must stay within `ID_MAX_LEN`; nanos alone
        // can run to 19 digits, so op/seed are kept short regardless of how
        // long a container_type's display token or a player_id get.
        let op = oj_core::short(&req.container_type.to_string(), 8);
        let seed = oj_core::short(&req.player_id.to_string(), 8);
        let id = ContainerId::new(op, seed, &self.clock);
        let container = Container::new(
            id,
            req.player_id,
            req.container_type,
            req.command_type,
            req.parent_container_id,
            req.config,
            req.max_iterations,
            &self.clock,
        );

        if req.dry_run {
            self.container_repo.insert(container)?;
            return Ok(Persisted::Created(id));
        }

        match &req.singleton_key {
            Some(key) => {
                let inserted = match key {
                    SingletonKey::ContractWorkflow { .. } => {
                        self.container_repo.create_if_no_active_worker(key, container)?
                    }
                    _ => self.container_repo.create_if_no_active_coordinator(key, container)?,
                };
                if !inserted {
                    let holder = self
                        .existing_singleton_holder(key)
                        .ok_or_else(|| ServerError::NotFound(format!("{key:?}")))?;
                    return Ok(Persisted::SingletonHeldBy(holder));
                }
            }
            None => self.container_repo.insert(container)?,
        }

        if req.container_type == ContainerType::ManufacturingCoordinator {
            let stale =
                StaleDetector::new(self.clock.clone(), self.container_repo.clone(), self.ship_repo.clone(), self.tunables);
            let stopped = stale.sweep_orphaned_workers(req.player_id);
            if stopped > 0 {
                tracing::info!(
                    player_id = %req.player_id,
                    stopped,
                    "stopped orphaned manufacturing workers on coordinator takeover"
                );
            }
        }

        Ok(Persisted::Created(id))
    }

    /// `persistXxx` for a worker whose creation and start are split in time
    /// (§4.3): persists the row and stashes `command` (if the caller has one
    /// already built) for `start_worker` to consume. Returns the existing
    /// holder's id, with `command` discarded, if a singleton key is held.
    pub fn persist_worker(&self, req: CreateRequest, command: Option<Command>) -> Result<ContainerId, ServerError> {
        match self.persist_container(req)? {
            Persisted::Created(id) => {
                if let Some(command) = command {
                    self.pending_worker_commands.lock().insert(id, command);
                }
                Ok(id)
            }
            Persisted::SingletonHeldBy(id) => Ok(id),
        }
    }

    /// `startXxx`: builds and registers the runner for an already-persisted
    /// row, consuming any command stashed by `persist_worker`.
    pub async fn start_worker(self: &Arc<Self>, id: ContainerId) -> Result<(), ServerError> {
        let container = self.container_repo.get(&id).ok_or(ServerError::NotFound(id.to_string()))?;

        let runner = ContainerRunner::new(
            id,
            container.player_id,
            container.command_type.clone(),
            self.clock.clone(),
            self.container_repo.clone(),
            self.ship_repo.clone(),
            self.logger.clone(),
            self.mediator.clone(),
            self.factories.clone(),
            self.tunables,
        );
        if let Some(publisher) = &self.publisher {
            runner.set_event_publisher(publisher.clone());
        }
        if let Some(command) = self.pending_worker_commands.lock().remove(&id) {
            runner.set_first_command(command);
        }

        runner.start().await?;
        self.runners.write().insert(id, runner);
        Ok(())
    }

    fn existing_singleton_holder(&self, key: &SingletonKey) -> Option<ContainerId> {
        let (player_id, container_type) = match key {
            SingletonKey::ManufacturingCoordinator { player_id, .. } => {
                (*player_id, ContainerType::ManufacturingCoordinator)
            }
            SingletonKey::GasCoordinator { player_id, .. } => (*player_id, ContainerType::GasCoordinator),
            SingletonKey::ContractWorkflow { player_id } => (*player_id, ContainerType::ContractWorkflow),
        };
        self.container_repo
            .list(&ContainerFilter { player_id: Some(player_id), status: None })
            .into_iter()
            .find(|c| c.container_type == container_type && c.status.is_active())
            .map(|c| c.id)
    }

    pub fn list_containers(&self, player_id: Option<PlayerId>, status: Option<ContainerStatus>) -> Vec<Container> {
        self.container_repo.list(&ContainerFilter { player_id, status })
    }

    pub fn get_container(&self, id: &ContainerId) -> Option<Container> {
        self.container_repo.get(id)
    }

    /// Logs come from the shared [`ContainerLogger`] rather than a
    /// registered runner, so they're available for containers that have
    /// already gone terminal.
    pub fn container_logs(
        &self,
        id: &ContainerId,
        limit: usize,
        min_level: Option<oj_core::LogLevel>,
    ) -> Vec<oj_core::LogEntry> {
        self.logger.tail(id, limit, min_level)
    }

    /// Count of rows currently `PENDING`/`RUNNING`, for `healthCheck`.
    /// Computed from the repository rather than `runners.len()`, since the
    /// registry keeps entries for runners past their terminal transition.
    pub fn active_container_count(&self) -> usize {
        self.container_repo
            .list(&ContainerFilter { player_id: None, status: None })
            .iter()
            .filter(|c| c.status.is_active())
            .count()
    }

    pub async fn stop_container(&self, id: &ContainerId) -> Result<(), ServerError> {
        let runner = self.runners.write().remove(id);
        match runner {
            Some(runner) => Ok(runner.stop().await?),
            None => Err(ServerError::NotFound(id.to_string())),
        }
    }

    pub fn registered_runner_count(&self) -> usize {
        self.runners.read().len()
    }

    pub fn tunables(&self) -> Tunables {
        self.tunables
    }

    /// §4.3's shutdown sequence: interrupt every registered runner
    /// concurrently, bounded to 1s total, then drop the registry.
    pub async fn shutdown(&self) {
        let runners: Vec<_> = self.runners.write().drain().map(|(_, runner)| runner).collect();
        let interrupts = runners.into_iter().map(|runner| async move {
            if let Err(e) = runner.interrupt().await {
                tracing::warn!(container_id = %runner.id(), error = %e, "failed to interrupt runner on shutdown");
            }
        });
        let _ = tokio::time::timeout(Duration::from_secs(1), futures_join_all(interrupts)).await;
    }
}

/// Minimal stand-in for `futures::future::join_all` so shutdown doesn't
/// pull in the whole `futures` crate for one call site.
async fn futures_join_all<I>(iter: I)
where
    I: IntoIterator,
    I::Item: std::future::Future<Output = ()>,
{
    let mut set = tokio::task::JoinSet::new();
    for fut in iter {
        set.spawn(fut);
    }
    while set.join_next().await.is_some() {}
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
