// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository contracts the runner, daemon server, and recovery engine
//! persist container/log/ship state through.
//!
//! Methods are synchronous: every implementation in this crate guards its
//! state with a short-lived lock and never performs blocking I/O while
//! holding it, so calling from async code is safe.

use oj_core::{Container, ContainerId, ContainerStatus, LogEntry, LogLevel, PlayerId, Ship, ShipSymbol, SingletonKey};

use crate::error::StorageError;

/// Optional filters for `list_containers`.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilter {
    pub player_id: Option<PlayerId>,
    pub status: Option<ContainerStatus>,
}

pub trait ContainerRepository: Send + Sync {
    fn insert(&self, container: Container) -> Result<(), StorageError>;

    fn get(&self, id: &ContainerId) -> Option<Container>;

    fn update(&self, container: Container) -> Result<(), StorageError>;

    fn list(&self, filter: &ContainerFilter) -> Vec<Container>;

    /// Containers with a given `parent_container_id` — coordinators reading
    /// back their own workers.
    fn list_children(&self, parent_container_id: &ContainerId) -> Vec<Container>;

    /// Every row in `RUNNING`/`INTERRUPTED`, for startup recovery.
    fn list_recoverable(&self) -> Vec<Container>;

    /// Atomically insert `container` unless an active (`PENDING`/`RUNNING`)
    /// row of the same `container_type` already holds `key`. Returns
    /// `Ok(false)` without inserting when one does.
    fn create_if_no_active_worker(
        &self,
        key: &SingletonKey,
        container: Container,
    ) -> Result<bool, StorageError>;

    /// Same contract, named separately so call sites read as enforcing a
    /// coordinator-level singleton rather than a worker-level one; the
    /// dispatch is identical (`SingletonKey` already disambiguates domain).
    fn create_if_no_active_coordinator(
        &self,
        key: &SingletonKey,
        container: Container,
    ) -> Result<bool, StorageError>;
}

pub trait LogRepository: Send + Sync {
    fn append(&self, entry: LogEntry) -> Result<(), StorageError>;

    /// Most recent entries for `container_id`, newest first, optionally
    /// filtered to `min_level` and capped at `limit` (0 = unlimited).
    fn list(&self, container_id: &ContainerId, limit: usize, min_level: Option<LogLevel>) -> Vec<LogEntry>;
}

pub trait ShipRepository: Send + Sync {
    fn get(&self, ship_symbol: &ShipSymbol) -> Option<Ship>;

    fn upsert(&self, ship: Ship) -> Result<(), StorageError>;

    /// Ships currently reserved by `container_id`, used by the runner to
    /// release every reservation it holds on terminal exit.
    fn list_by_container(&self, container_id: &ContainerId) -> Vec<Ship>;

    fn list_in_transit(&self) -> Vec<Ship>;

    fn list_with_pending_cooldown(&self) -> Vec<Ship>;
}
