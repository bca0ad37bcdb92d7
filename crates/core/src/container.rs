// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container lifecycle state machine and its in-memory entity.
//!
//! A container wraps one application-level command and is mutated only by
//! its runner. This module owns the pure transition logic (§4.1); the runner
//! (in `oj-daemon`) sequences transitions with I/O (persistence, ship
//! reservation, heartbeats) around them.

use crate::clock::Clock;
use crate::error::{CoreError, ExitReason};
use crate::id::IdBuf;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Globally unique container identifier, format `<op>-<seed>-<unix_nanos>`.
///
/// `op` is a short per-command-type code (e.g. `"nav"`, `"mcoord"`) and
/// `seed` is caller-supplied (typically the ship symbol or a counter);
/// uniqueness rests on the nanosecond timestamp, not on `op`/`seed` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(IdBuf);

impl ContainerId {
    pub fn new(op: &str, seed: &str, clock: &impl Clock) -> Self {
        Self(IdBuf::new(&format!("{op}-{seed}-{}", clock.epoch_nanos())))
    }

    /// Parse a persisted id string back into a `ContainerId`.
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(IdBuf::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::borrow::Borrow<str> for ContainerId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Every container type the daemon can orchestrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    Scout,
    Trading,
    Navigate,
    Dock,
    Orbit,
    Refuel,
    Jettison,
    Purchase,
    ContractWorkflow,
    ContractFleetCoordinator,
    MiningCoordinator,
    MiningWorker,
    TransportWorker,
    GasCoordinator,
    GasSiphonWorker,
    GasTransportWorker,
    StorageShip,
    ManufacturingCoordinator,
    ManufacturingTaskWorker,
    GoodsFactoryCoordinator,
    ArbitrageCoordinator,
    ArbitrageWorker,
    ScoutFleetAssignment,
}

crate::simple_display! {
    ContainerType {
        Scout => "scout",
        Trading => "trading",
        Navigate => "navigate",
        Dock => "dock",
        Orbit => "orbit",
        Refuel => "refuel",
        Jettison => "jettison",
        Purchase => "purchase",
        ContractWorkflow => "contract_workflow",
        ContractFleetCoordinator => "contract_fleet_coordinator",
        MiningCoordinator => "mining_coordinator",
        MiningWorker => "mining_worker",
        TransportWorker => "transport_worker",
        GasCoordinator => "gas_coordinator",
        GasSiphonWorker => "gas_siphon_worker",
        GasTransportWorker => "gas_transport_worker",
        StorageShip => "storage_ship",
        ManufacturingCoordinator => "manufacturing_coordinator",
        ManufacturingTaskWorker => "manufacturing_task_worker",
        GoodsFactoryCoordinator => "goods_factory_coordinator",
        ArbitrageCoordinator => "arbitrage_coordinator",
        ArbitrageWorker => "arbitrage_worker",
        ScoutFleetAssignment => "scout_fleet_assignment",
    }
}

impl std::str::FromStr for ContainerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "scout" => ContainerType::Scout,
            "trading" => ContainerType::Trading,
            "navigate" => ContainerType::Navigate,
            "dock" => ContainerType::Dock,
            "orbit" => ContainerType::Orbit,
            "refuel" => ContainerType::Refuel,
            "jettison" => ContainerType::Jettison,
            "purchase" => ContainerType::Purchase,
            "contract_workflow" => ContainerType::ContractWorkflow,
            "contract_fleet_coordinator" => ContainerType::ContractFleetCoordinator,
            "mining_coordinator" => ContainerType::MiningCoordinator,
            "mining_worker" => ContainerType::MiningWorker,
            "transport_worker" => ContainerType::TransportWorker,
            "gas_coordinator" => ContainerType::GasCoordinator,
            "gas_siphon_worker" => ContainerType::GasSiphonWorker,
            "gas_transport_worker" => ContainerType::GasTransportWorker,
            "storage_ship" => ContainerType::StorageShip,
            "manufacturing_coordinator" => ContainerType::ManufacturingCoordinator,
            "manufacturing_task_worker" => ContainerType::ManufacturingTaskWorker,
            "goods_factory_coordinator" => ContainerType::GoodsFactoryCoordinator,
            "arbitrage_coordinator" => ContainerType::ArbitrageCoordinator,
            "arbitrage_worker" => ContainerType::ArbitrageWorker,
            "scout_fleet_assignment" => ContainerType::ScoutFleetAssignment,
            other => return Err(format!("unknown container type: {other}")),
        })
    }
}

impl ContainerType {
    /// Coordinators spawn worker containers under their id as `parent_container_id`.
    pub fn is_coordinator(&self) -> bool {
        matches!(
            self,
            ContainerType::ContractFleetCoordinator
                | ContainerType::MiningCoordinator
                | ContainerType::GasCoordinator
                | ContainerType::ManufacturingCoordinator
                | ContainerType::GoodsFactoryCoordinator
                | ContainerType::ArbitrageCoordinator
        )
    }

    pub fn is_worker(&self) -> bool {
        matches!(
            self,
            ContainerType::MiningWorker
                | ContainerType::TransportWorker
                | ContainerType::GasSiphonWorker
                | ContainerType::GasTransportWorker
                | ContainerType::ManufacturingTaskWorker
                | ContainerType::ArbitrageWorker
        )
    }

    /// Default restart budget for `canRestart()`. Policy-driven; a single
    /// bounded small integer covers every type until a per-type override is
    /// needed.
    pub const DEFAULT_MAX_RESTARTS: u32 = 3;
}

/// Container lifecycle state (§4.1). See the module diagram in the spec for
/// the full transition table; this type only enumerates the states and the
/// terminal/active classification used by singleton enforcement and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopping,
    Stopped,
    Interrupted,
    Cancelled,
}

crate::simple_display! {
    ContainerStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Stopping => "stopping",
        Stopped => "stopped",
        Interrupted => "interrupted",
        Cancelled => "cancelled",
    }
}

impl ContainerStatus {
    /// `true` for `PENDING`/`RUNNING` — the always-included part of the
    /// per-type "active_set" used by singleton enforcement (I2).
    pub fn is_active(&self) -> bool {
        matches!(self, ContainerStatus::Pending | ContainerStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ContainerStatus::Completed
                | ContainerStatus::Failed
                | ContainerStatus::Stopped
                | ContainerStatus::Interrupted
                | ContainerStatus::Cancelled
        )
    }

    /// Recovery reloads rows in exactly these two statuses (§4.4 step 2).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ContainerStatus::Running | ContainerStatus::Interrupted)
    }
}

/// The uniqueness key enforced per container type (§4.3). "Active" always
/// includes `PENDING`/`RUNNING`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SingletonKey {
    /// (player_id, system_symbol); also triggers orphan-worker cleanup.
    ManufacturingCoordinator { player_id: PlayerId, system_symbol: String },
    /// (player_id, gas_giant); dry-run creations bypass the check.
    GasCoordinator { player_id: PlayerId, gas_giant: String },
    /// (player_id); enforced atomically via `createIfNoActiveWorker`.
    ContractWorkflow { player_id: PlayerId },
}

/// What happened when `increment_iteration` was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Continue,
    ReachedLimit,
}

/// What the runner should do after `fail()` records a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Caller should call `record_restart()` then `reset()` and re-enter the loop.
    WillRetry,
    /// Terminal: caller releases reservations and publishes completion.
    Terminal,
}

/// In-memory value object tracking one container's mutable state (§3).
/// Exclusively owned by its runner; the durable store owns canonical truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub player_id: PlayerId,
    pub container_type: ContainerType,
    pub command_type: String,
    pub parent_container_id: Option<ContainerId>,
    pub config: serde_json::Value,
    pub max_iterations: i64,
    pub current_iteration: i64,
    pub restart_count: u32,
    pub status: ContainerStatus,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub stopped_at: Option<u64>,
    pub heartbeat_at: Option<u64>,
    pub updated_at: u64,
    pub exit_code: Option<i32>,
    pub exit_reason: Option<String>,
}

impl Container {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ContainerId,
        player_id: PlayerId,
        container_type: ContainerType,
        command_type: impl Into<String>,
        parent_container_id: Option<ContainerId>,
        config: serde_json::Value,
        max_iterations: i64,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.epoch_ms();
        Self {
            id,
            player_id,
            container_type,
            command_type: command_type.into(),
            parent_container_id,
            config,
            max_iterations,
            current_iteration: 0,
            restart_count: 0,
            status: ContainerStatus::Pending,
            created_at: now,
            started_at: None,
            stopped_at: None,
            heartbeat_at: None,
            updated_at: now,
            exit_code: None,
            exit_reason: None,
        }
    }

    /// `PENDING → RUNNING`. Errors with [`CoreError::InvalidTransition`]
    /// unless status is `PENDING`.
    pub fn start(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status != ContainerStatus::Pending {
            return Err(CoreError::InvalidTransition { action: "start", from: self.status });
        }
        self.status = ContainerStatus::Running;
        self.started_at = Some(clock.epoch_ms());
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// `current_iteration += 1`; reports whether `max_iterations` has now
    /// been reached so the caller can transition to `COMPLETED`.
    pub fn increment_iteration(&mut self, clock: &impl Clock) -> IterationOutcome {
        self.current_iteration += 1;
        self.updated_at = clock.epoch_ms();
        if self.max_iterations >= 0 && self.current_iteration >= self.max_iterations {
            IterationOutcome::ReachedLimit
        } else {
            IterationOutcome::Continue
        }
    }

    /// `RUNNING → COMPLETED`, `exit_code = 0`.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status != ContainerStatus::Running {
            return Err(CoreError::InvalidTransition { action: "complete", from: self.status });
        }
        self.status = ContainerStatus::Completed;
        self.stopped_at = Some(clock.epoch_ms());
        self.exit_code = Some(0);
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// `RUNNING → FAILED`, recording the attempt's outcome. Whether the
    /// caller should then retry is decided by `can_restart` — this method
    /// only records the failed attempt, matching the diagram's single
    /// `fail()` transition shared by both the retryable and terminal paths.
    pub fn fail(&mut self, reason: ExitReason, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status != ContainerStatus::Running {
            return Err(CoreError::InvalidTransition { action: "fail", from: self.status });
        }
        self.status = ContainerStatus::Failed;
        self.stopped_at = Some(clock.epoch_ms());
        self.exit_code = Some(1);
        self.exit_reason = Some(reason.to_string());
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// `restart_count < max_restarts` — the retry-eligibility check the
    /// runner applies before calling `record_restart` + `reset`.
    pub fn can_restart(&self, max_restarts: u32) -> bool {
        self.restart_count < max_restarts
    }

    /// Increments `restart_count`. Called once per retry, before `reset()`.
    pub fn record_restart(&mut self) {
        self.restart_count += 1;
    }

    /// `FAILED → PENDING`. Clears `current_iteration`-transient fields but
    /// leaves `restart_count` untouched (it is monotonic across the
    /// container's lifetime, not reset per retry).
    pub fn reset(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status != ContainerStatus::Failed {
            return Err(CoreError::InvalidTransition { action: "reset", from: self.status });
        }
        self.status = ContainerStatus::Pending;
        self.current_iteration = 0;
        self.started_at = None;
        self.stopped_at = None;
        self.exit_code = None;
        self.exit_reason = None;
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// Succeeds from any non-terminal state; idempotent (no-op) on terminal
    /// states, including when already `STOPPING`.
    pub fn stop(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status.is_terminal() || self.status == ContainerStatus::Stopping {
            return Ok(());
        }
        self.status = ContainerStatus::Stopping;
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// `STOPPING → STOPPED`, forced after `GracefulStopTimeout` elapses (or
    /// after the background task observes cancellation and exits cleanly).
    /// `exit_code` stays `None` — null on graceful stop, per §7.
    pub fn mark_stopped(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status != ContainerStatus::Stopping {
            return Err(CoreError::InvalidTransition { action: "mark_stopped", from: self.status });
        }
        self.status = ContainerStatus::Stopped;
        self.stopped_at = Some(clock.epoch_ms());
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// `INTERRUPTED → RUNNING`, used only by startup recovery resuming a row
    /// left `INTERRUPTED` by a graceful shutdown (or already `RUNNING`, the
    /// crash-kill case, where this is a no-op). Clears the stale
    /// `stopped_at`/`exit_reason` a prior interrupt left behind.
    pub fn resume(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status == ContainerStatus::Running {
            return Ok(());
        }
        if self.status != ContainerStatus::Interrupted {
            return Err(CoreError::InvalidTransition { action: "resume", from: self.status });
        }
        self.status = ContainerStatus::Running;
        self.stopped_at = None;
        self.exit_reason = None;
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// `RUNNING → INTERRUPTED`, written only by daemon shutdown.
    pub fn interrupt(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status != ContainerStatus::Running {
            return Err(CoreError::InvalidTransition { action: "interrupt", from: self.status });
        }
        self.status = ContainerStatus::Interrupted;
        self.stopped_at = Some(clock.epoch_ms());
        self.exit_reason = Some(ExitReason::daemon_shutdown().to_string());
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    /// Recycled by a parent coordinator. Valid from any non-terminal state.
    pub fn cancel(&mut self, clock: &impl Clock) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidTransition { action: "cancel", from: self.status });
        }
        self.status = ContainerStatus::Cancelled;
        self.stopped_at = Some(clock.epoch_ms());
        self.updated_at = clock.epoch_ms();
        Ok(())
    }

    pub fn record_heartbeat(&mut self, clock: &impl Clock) {
        // (I5) heartbeat_at is monotonically non-decreasing per container.
        let now = clock.epoch_ms();
        let advances = match self.heartbeat_at {
            Some(prev) => now >= prev,
            None => true,
        };
        if advances {
            self.heartbeat_at = Some(now);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ContainerBuilder => Container {
        set {
            id: ContainerId = ContainerId::from_string("test-seed-1"),
            player_id: PlayerId = PlayerId::new(7),
            container_type: ContainerType = ContainerType::Navigate,
            parent_container_id: Option<ContainerId> = None,
            config: serde_json::Value = serde_json::Value::Null,
            max_iterations: i64 = 1,
            current_iteration: i64 = 0,
            restart_count: u32 = 0,
            status: ContainerStatus = ContainerStatus::Pending,
            created_at: u64 = 0,
            started_at: Option<u64> = None,
            stopped_at: Option<u64> = None,
            heartbeat_at: Option<u64> = None,
            updated_at: u64 = 0,
            exit_code: Option<i32> = None,
            exit_reason: Option<String> = None,
        }
        into {
            command_type: String = "test_command",
        }
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
