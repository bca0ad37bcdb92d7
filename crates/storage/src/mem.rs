// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory repository implementation. The default backing store for
//! tests; [`crate::durable::DurableStore`] wraps one of these with WAL
//! persistence for the daemon binary.

use std::collections::HashMap;

use oj_core::{Container, ContainerId, LogEntry, LogLevel, Ship, ShipSymbol, SingletonKey};
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::repository::{ContainerFilter, ContainerRepository, LogRepository, ShipRepository};

#[derive(Default)]
pub struct MemStore {
    containers: RwLock<HashMap<ContainerId, Container>>,
    logs: RwLock<HashMap<ContainerId, Vec<LogEntry>>>,
    ships: RwLock<HashMap<ShipSymbol, Ship>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every row, for WAL checkpointing.
    pub fn snapshot(&self) -> MemSnapshot {
        MemSnapshot {
            containers: self.containers.read().values().cloned().collect(),
            logs: self.logs.read().values().flatten().cloned().collect(),
            ships: self.ships.read().values().cloned().collect(),
        }
    }

    /// Rebuild state from a snapshot, replacing whatever was there.
    pub fn restore(&self, snapshot: MemSnapshot) {
        *self.containers.write() = snapshot.containers.into_iter().map(|c| (c.id, c)).collect();
        let mut logs: HashMap<ContainerId, Vec<LogEntry>> = HashMap::new();
        for entry in snapshot.logs {
            logs.entry(entry.container_id).or_default().push(entry);
        }
        *self.logs.write() = logs;
        *self.ships.write() = snapshot.ships.into_iter().map(|s| (s.ship_symbol, s)).collect();
    }

    fn active_holds_key(containers: &HashMap<ContainerId, Container>, key: &SingletonKey) -> bool {
        containers.values().any(|c| c.status.is_active() && singleton_key_of(c).as_ref() == Some(key))
    }

    /// Whether an active row currently holds `key`. Exposed so
    /// [`crate::durable::DurableStore`] can perform the same check before
    /// committing a WAL record, without duplicating `singleton_key_of`.
    pub(crate) fn holds_active_key(&self, key: &SingletonKey) -> bool {
        Self::active_holds_key(&self.containers.read(), key)
    }
}

/// The (player_id, container_type)-scoped key a given container occupies,
/// if its type participates in singleton enforcement (§4.3).
fn singleton_key_of(c: &Container) -> Option<SingletonKey> {
    use oj_core::ContainerType::*;
    match c.container_type {
        ManufacturingCoordinator => c.config.get("system_symbol").and_then(|v| v.as_str()).map(
            |system_symbol| SingletonKey::ManufacturingCoordinator {
                player_id: c.player_id,
                system_symbol: system_symbol.to_string(),
            },
        ),
        GasCoordinator => c.config.get("gas_giant").and_then(|v| v.as_str()).map(|gas_giant| {
            SingletonKey::GasCoordinator { player_id: c.player_id, gas_giant: gas_giant.to_string() }
        }),
        ContractWorkflow => {
            Some(SingletonKey::ContractWorkflow { player_id: c.player_id })
        }
        _ => None,
    }
}

impl ContainerRepository for MemStore {
    fn insert(&self, container: Container) -> Result<(), StorageError> {
        self.containers.write().insert(container.id, container);
        Ok(())
    }

    fn get(&self, id: &ContainerId) -> Option<Container> {
        self.containers.read().get(id).cloned()
    }

    fn update(&self, container: Container) -> Result<(), StorageError> {
        let mut containers = self.containers.write();
        if !containers.contains_key(&container.id) {
            return Err(StorageError::NotFound(container.id.to_string()));
        }
        containers.insert(container.id, container);
        Ok(())
    }

    fn list(&self, filter: &ContainerFilter) -> Vec<Container> {
        self.containers
            .read()
            .values()
            .filter(|c| filter.player_id.map_or(true, |p| c.player_id == p))
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .cloned()
            .collect()
    }

    fn list_children(&self, parent_container_id: &ContainerId) -> Vec<Container> {
        self.containers
            .read()
            .values()
            .filter(|c| c.parent_container_id.as_ref() == Some(parent_container_id))
            .cloned()
            .collect()
    }

    fn list_recoverable(&self) -> Vec<Container> {
        self.containers.read().values().filter(|c| c.status.is_recoverable()).cloned().collect()
    }

    fn create_if_no_active_worker(
        &self,
        key: &SingletonKey,
        container: Container,
    ) -> Result<bool, StorageError> {
        let mut containers = self.containers.write();
        if Self::active_holds_key(&containers, key) {
            return Ok(false);
        }
        containers.insert(container.id, container);
        Ok(true)
    }

    fn create_if_no_active_coordinator(
        &self,
        key: &SingletonKey,
        container: Container,
    ) -> Result<bool, StorageError> {
        self.create_if_no_active_worker(key, container)
    }
}

impl LogRepository for MemStore {
    fn append(&self, entry: LogEntry) -> Result<(), StorageError> {
        self.logs.write().entry(entry.container_id).or_default().push(entry);
        Ok(())
    }

    fn list(
        &self,
        container_id: &ContainerId,
        limit: usize,
        min_level: Option<LogLevel>,
    ) -> Vec<LogEntry> {
        let logs = self.logs.read();
        let Some(entries) = logs.get(container_id) else { return Vec::new() };
        let mut matching: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|e| min_level.map_or(true, |min| e.level >= min))
            .cloned()
            .collect();
        if limit > 0 {
            matching.truncate(limit);
        }
        matching
    }
}

impl ShipRepository for MemStore {
    fn get(&self, ship_symbol: &ShipSymbol) -> Option<Ship> {
        self.ships.read().get(ship_symbol).cloned()
    }

    fn upsert(&self, ship: Ship) -> Result<(), StorageError> {
        self.ships.write().insert(ship.ship_symbol, ship);
        Ok(())
    }

    fn list_by_container(&self, container_id: &ContainerId) -> Vec<Ship> {
        self.ships
            .read()
            .values()
            .filter(|s| s.container_id.as_ref() == Some(container_id))
            .cloned()
            .collect()
    }

    fn list_in_transit(&self) -> Vec<Ship> {
        self.ships.read().values().filter(|s| s.is_in_transit()).cloned().collect()
    }

    fn list_with_pending_cooldown(&self) -> Vec<Ship> {
        self.ships.read().values().filter(|s| s.has_pending_cooldown()).cloned().collect()
    }
}

/// Point-in-time dump of every row, used for WAL checkpoints.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MemSnapshot {
    pub containers: Vec<Container>,
    pub logs: Vec<LogEntry>,
    pub ships: Vec<Ship>,
}

#[cfg(test)]
#[path = "mem_tests.rs"]
mod tests;
