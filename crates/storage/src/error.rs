// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the durable store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no row for id {0}")]
    NotFound(String),

    /// Raised by `create_if_no_active_worker`/`create_if_no_active_coordinator`
    /// when an active row already holds the singleton key.
    #[error("an active container already holds singleton key {0:?}")]
    SingletonConflict(oj_core::SingletonKey),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("wal error: {0}")]
    Wal(#[from] crate::wal::WalError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::checkpoint::SnapshotError),

    #[error("snapshot migration error: {0}")]
    Migration(#[from] crate::migration::MigrationError),
}
