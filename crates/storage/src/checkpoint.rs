// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zstd-compressed snapshot persistence for crash recovery.
//!
//! A snapshot captures the complete [`MemSnapshot`] at a point in time,
//! tagged with the WAL sequence number it was taken at. Recovery loads the
//! most recent snapshot and replays WAL entries after that sequence.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::mem::MemSnapshot;
use crate::migration::MigrationRegistry;
use crate::wal::rotate_bak_path;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("snapshot migration error: {0}")]
    Migration(#[from] crate::migration::MigrationError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub v: u32,
    pub seq: u64,
    pub state: MemSnapshot,
    pub created_at_ms: u64,
}

impl Snapshot {
    pub fn new(seq: u64, state: MemSnapshot, created_at_ms: u64) -> Self {
        Self { v: CURRENT_SNAPSHOT_VERSION, seq, state, created_at_ms }
    }

    /// Compress and write atomically: serialize, zstd-encode, write to
    /// `.tmp`, fsync, then rename over `path`.
    pub fn save(&self, path: &Path, compression_level: i32) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let json_bytes = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json_bytes.as_slice(), compression_level)
            .map_err(|e| SnapshotError::Compress(e.to_string()))?;

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&compressed)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load and decompress the snapshot at `path`, migrating it to
    /// [`CURRENT_SNAPSHOT_VERSION`] if it was written by an older build.
    /// Returns `Ok(None)` if the file doesn't exist; a corrupt file is
    /// rotated to `.bak` and also reported as `Ok(None)` so the caller falls
    /// back to a full WAL replay.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let decoded = match zstd::stream::decode_all(BufReader::new(file)) {
            Ok(bytes) => bytes,
            Err(e) => return Self::quarantine(path, &e.to_string()),
        };

        let value: Value = match serde_json::from_slice(&decoded) {
            Ok(v) => v,
            Err(e) => return Self::quarantine(path, &e.to_string()),
        };

        let registry = MigrationRegistry::new();
        let migrated = registry.migrate_to(value, CURRENT_SNAPSHOT_VERSION)?;
        let snapshot: Self = serde_json::from_value(migrated)?;
        Ok(Some(snapshot))
    }

    fn quarantine(path: &Path, reason: &str) -> Result<Option<Self>, SnapshotError> {
        let bak_path = rotate_bak_path(path);
        warn!(
            error = reason,
            path = %path.display(),
            bak = %bak_path.display(),
            "corrupt snapshot, moving to .bak and falling back to wal replay",
        );
        fs::rename(path, &bak_path)?;
        Ok(None)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
