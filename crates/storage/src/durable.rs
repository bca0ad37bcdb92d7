// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`MemStore`] plus a WAL, for the daemon binary.
//!
//! Every mutating call is written to the WAL and fsynced before it's applied
//! to the in-memory store, so a crash mid-write loses at most the in-flight
//! call, never a previously-acknowledged one. `checkpoint()` compresses the
//! current state to a zstd snapshot and truncates the WAL up to that point;
//! callers are expected to run it periodically (or on graceful shutdown)
//! rather than on every write, the way the runner schedules it off the hot
//! path.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use oj_core::{Container, ContainerId, LogEntry, LogLevel, Ship, ShipSymbol, SingletonKey};

use crate::checkpoint::Snapshot;
use crate::error::StorageError;
use crate::mem::MemStore;
use crate::repository::{ContainerFilter, ContainerRepository, LogRepository, ShipRepository};
use crate::wal::{Record, Wal};

const WAL_FILE_NAME: &str = "wal.jsonl";
const SNAPSHOT_FILE_NAME: &str = "snapshot.zst";
const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;

pub struct DurableStore {
    mem: MemStore,
    wal: Mutex<Wal>,
    dir: PathBuf,
}

impl DurableStore {
    /// Open (or create) a durable store rooted at `dir`: load the latest
    /// snapshot if one exists, then replay every WAL record written since.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        let mem = MemStore::new();

        let mut processed_seq = 0u64;
        if let Some(snapshot) = Snapshot::load(&dir.join(SNAPSHOT_FILE_NAME))? {
            mem.restore(snapshot.state);
            processed_seq = snapshot.seq;
        }

        let mut wal = Wal::open(&dir.join(WAL_FILE_NAME), processed_seq)?;
        for entry in wal.entries_after(processed_seq)? {
            apply_record(&mem, entry.record)?;
            wal.mark_processed(entry.seq);
        }

        Ok(Self { mem, wal: Mutex::new(wal), dir })
    }

    /// Snapshot the in-memory store to disk and truncate the WAL up to the
    /// sequence number covered by that snapshot.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        let state = self.mem.snapshot();
        let mut wal = self.wal.lock();
        let seq = wal.write_seq();
        Snapshot::new(seq, state, now_ms()).save(&self.snapshot_path(), SNAPSHOT_COMPRESSION_LEVEL)?;
        wal.mark_processed(seq);
        wal.truncate_before(seq + 1)?;
        Ok(())
    }

    /// Write a shutdown marker to the WAL so recovery can tell an orderly
    /// stop apart from a crash, then checkpoint.
    pub fn shutdown(&self) -> Result<(), StorageError> {
        self.append_and_flush(&Record::Shutdown)?;
        self.checkpoint()
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE_NAME)
    }

    fn append_and_flush(&self, record: &Record) -> Result<(), StorageError> {
        let mut wal = self.wal.lock();
        let seq = wal.append(record)?;
        wal.flush()?;
        wal.mark_processed(seq);
        Ok(())
    }
}

fn apply_record(mem: &MemStore, record: Record) -> Result<(), StorageError> {
    match record {
        Record::ContainerInserted(c) | Record::ContainerUpdated(c) => mem.insert(c),
        Record::LogAppended(entry) => mem.append(entry),
        Record::ShipUpserted(ship) => mem.upsert(ship),
        Record::Shutdown => Ok(()),
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

impl ContainerRepository for DurableStore {
    fn insert(&self, container: Container) -> Result<(), StorageError> {
        self.append_and_flush(&Record::ContainerInserted(container.clone()))?;
        self.mem.insert(container)
    }

    fn get(&self, id: &ContainerId) -> Option<Container> {
        self.mem.get(id)
    }

    fn update(&self, container: Container) -> Result<(), StorageError> {
        if self.mem.get(&container.id).is_none() {
            return Err(StorageError::NotFound(container.id.to_string()));
        }
        self.append_and_flush(&Record::ContainerUpdated(container.clone()))?;
        self.mem.insert(container)
    }

    fn list(&self, filter: &ContainerFilter) -> Vec<Container> {
        self.mem.list(filter)
    }

    fn list_children(&self, parent_container_id: &ContainerId) -> Vec<Container> {
        self.mem.list_children(parent_container_id)
    }

    fn list_recoverable(&self) -> Vec<Container> {
        self.mem.list_recoverable()
    }

    fn create_if_no_active_worker(
        &self,
        key: &SingletonKey,
        container: Container,
    ) -> Result<bool, StorageError> {
        if self.mem.holds_active_key(key) {
            return Ok(false);
        }
        self.append_and_flush(&Record::ContainerInserted(container.clone()))?;
        self.mem.insert(container)?;
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

impl LogRepository for DurableStore {
    fn append(&self, entry: LogEntry) -> Result<(), StorageError> {
        self.append_and_flush(&Record::LogAppended(entry.clone()))?;
        self.mem.append(entry)
    }

    fn list(&self, container_id: &ContainerId, limit: usize, min_level: Option<LogLevel>) -> Vec<LogEntry> {
        self.mem.list(container_id, limit, min_level)
    }
}

impl ShipRepository for DurableStore {
    fn get(&self, ship_symbol: &ShipSymbol) -> Option<Ship> {
        self.mem.get(ship_symbol)
    }

    fn upsert(&self, ship: Ship) -> Result<(), StorageError> {
        self.append_and_flush(&Record::ShipUpserted(ship.clone()))?;
        self.mem.upsert(ship)
    }

    fn list_by_container(&self, container_id: &ContainerId) -> Vec<Ship> {
        self.mem.list_by_container(container_id)
    }

    fn list_in_transit(&self) -> Vec<Ship> {
        self.mem.list_in_transit()
    }

    fn list_with_pending_cooldown(&self) -> Vec<Ship> {
        self.mem.list_with_pending_cooldown()
    }
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
