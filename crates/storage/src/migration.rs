// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot schema migration, applied when a WAL checkpoint written by an
//! older daemon build is loaded by a newer one.
//!
//! Snapshots are tagged `{"v": <version>, "seq": <wal sequence>, "state": {..}}`.
//! `MigrationRegistry` walks a chain of single-version-step [`Migration`]s from
//! the snapshot's recorded version up to the binary's current version.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("snapshot version {0} is newer than this binary's version {1}")]
    TooNew(u32, u32),

    #[error("no migration path from version {0} to {1}")]
    NoPath(u32, u32),
}

/// A single version-to-version snapshot transform.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, snapshot: &mut Value) -> Result<(), MigrationError>;
}

#[derive(Default)]
pub struct MigrationRegistry {
    pub migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply migrations in sequence until `snapshot`'s `v` field reaches
    /// `target_version`. A no-op when it's already there.
    pub fn migrate_to(&self, mut snapshot: Value, target_version: u32) -> Result<Value, MigrationError> {
        let mut current = snapshot_version(&snapshot);
        if current == target_version {
            return Ok(snapshot);
        }
        if current > target_version {
            return Err(MigrationError::TooNew(current, target_version));
        }

        while current < target_version {
            let step = self
                .migrations
                .iter()
                .find(|m| m.source_version() == current)
                .ok_or(MigrationError::NoPath(current, target_version))?;
            step.migrate(&mut snapshot)?;
            current = step.target_version();
            if let Some(obj) = snapshot.as_object_mut() {
                obj.insert("v".into(), current.into());
            }
        }
        Ok(snapshot)
    }
}

fn snapshot_version(snapshot: &Value) -> u32 {
    snapshot.get("v").and_then(Value::as_u64).unwrap_or(0) as u32
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
