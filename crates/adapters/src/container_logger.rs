// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-memory log ring plus best-effort durable persistence (§4.2).
//!
//! Every runner logs through one `ContainerLogger`: `log()` always updates
//! the in-memory ring synchronously (so `tail()`/`getLogs` is immediate),
//! and hands the durable write to a background task — mirroring how the
//! teacher keeps `AgentLogger`/`JobLogger` append-only writers off the
//! critical path and never lets a persistence failure break execution.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use oj_core::{Clock, ContainerId, LogEntry, LogLevel, PlayerId};
use oj_storage::LogRepository;
use parking_lot::Mutex;

/// Entries kept per container before the oldest is evicted.
const RING_CAPACITY: usize = 200;

pub struct ContainerLogger<R> {
    repo: Arc<R>,
    rings: Mutex<HashMap<ContainerId, VecDeque<LogEntry>>>,
}

impl<R: LogRepository + 'static> ContainerLogger<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo, rings: Mutex::new(HashMap::new()) }
    }

    /// Append one log line. The in-memory ring is updated before this
    /// returns; the durable write is fire-and-forget.
    pub fn log(
        &self,
        container_id: ContainerId,
        player_id: PlayerId,
        timestamp_ms: u64,
        level: LogLevel,
        message: impl Into<String>,
    ) {
        self.log_with_metadata(container_id, player_id, timestamp_ms, level, message, None);
    }

    /// Same as [`Self::log`], attaching structured metadata a handler wants
    /// alongside the message.
    pub fn log_with_metadata(
        &self,
        container_id: ContainerId,
        player_id: PlayerId,
        timestamp_ms: u64,
        level: LogLevel,
        message: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) {
        let mut entry = LogEntry::new(container_id, player_id, timestamp_ms, level, message);
        if let Some(metadata) = metadata {
            entry = entry.with_metadata(metadata);
        }

        {
            let mut rings = self.rings.lock();
            let ring = rings.entry(container_id).or_insert_with(|| VecDeque::with_capacity(RING_CAPACITY));
            if ring.len() == RING_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(entry.clone());
        }

        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = repo.append(entry) {
                tracing::warn!(%container_id, error = %e, "failed to persist container log entry");
            }
        });
    }

    /// Most recent in-memory entries for `container_id`, newest first,
    /// matching `ContainerRunner::getLogs` (§4.2). Falls back to nothing —
    /// callers wanting history predating this process should read the
    /// durable store's `LogRepository::list` directly.
    pub fn tail(&self, container_id: &ContainerId, limit: usize, min_level: Option<LogLevel>) -> Vec<LogEntry> {
        let rings = self.rings.lock();
        let Some(ring) = rings.get(container_id) else { return Vec::new() };
        let mut matching: Vec<LogEntry> =
            ring.iter().rev().filter(|e| min_level.map_or(true, |min| e.level >= min)).cloned().collect();
        if limit > 0 {
            matching.truncate(limit);
        }
        matching
    }

    /// Drop a container's in-memory ring once it's terminal and its logs
    /// have been durably persisted; the store remains the record of truth.
    pub fn forget(&self, container_id: &ContainerId) {
        self.rings.lock().remove(container_id);
    }
}

/// What a dispatched handler sees of the container's log stream (§6): write
/// access only, bound to the one container its command was built for. Object
/// safe so [`crate::Mediator::send`] can take it as `&dyn ContainerLog`
/// without pulling the storage backend's type parameter into the trait.
pub trait ContainerLog: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, metadata: Option<serde_json::Value>);
}

/// The concrete [`ContainerLog`] the runner injects before each dispatch.
pub struct ContainerLogContext<C, R> {
    logger: Arc<ContainerLogger<R>>,
    clock: C,
    container_id: ContainerId,
    player_id: PlayerId,
}

impl<C: Clock, R: LogRepository + 'static> ContainerLogContext<C, R> {
    pub fn new(logger: Arc<ContainerLogger<R>>, clock: C, container_id: ContainerId, player_id: PlayerId) -> Self {
        Self { logger, clock, container_id, player_id }
    }
}

impl<C: Clock, R: LogRepository + 'static> ContainerLog for ContainerLogContext<C, R> {
    fn log(&self, level: LogLevel, message: &str, metadata: Option<serde_json::Value>) {
        self.logger.log_with_metadata(self.container_id, self.player_id, self.clock.epoch_ms(), level, message, metadata);
    }
}

#[cfg(test)]
#[path = "container_logger_tests.rs"]
mod tests;
