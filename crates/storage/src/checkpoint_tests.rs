// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::mem::MemSnapshot;
use crate::migration::MigrationError;
use tempfile::tempdir;

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");

    let snapshot = Snapshot::new(7, MemSnapshot::default(), 1_000);
    snapshot.save(&path, 3).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 7);
    assert_eq!(loaded.v, CURRENT_SNAPSHOT_VERSION);
}

#[test]
fn load_on_a_missing_path_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.zst");
    assert!(Snapshot::load(&path).unwrap().is_none());
}

#[test]
fn save_produces_zstd_framed_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");

    Snapshot::new(1, MemSnapshot::default(), 1_000).save(&path, 3).unwrap();

    let data = std::fs::read(&path).unwrap();
    assert_eq!(&data[0..4], &[0x28, 0xB5, 0x2F, 0xFD], "should be zstd-framed");
}

#[test]
fn load_rejects_a_snapshot_newer_than_this_build() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");

    let raw = serde_json::json!({"v": 99, "seq": 42, "state": MemSnapshot::default(), "created_at_ms": 1000});
    let compressed = zstd::encode_all(serde_json::to_vec(&raw).unwrap().as_slice(), 3).unwrap();
    std::fs::write(&path, &compressed).unwrap();

    let err = Snapshot::load(&path).unwrap_err();
    assert!(
        matches!(err, SnapshotError::Migration(MigrationError::TooNew(99, _))),
        "expected TooNew, got {err:?}"
    );
}

#[test]
fn load_quarantines_a_corrupt_file_and_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");

    std::fs::write(&path, b"not a zstd frame at all").unwrap();

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(path.with_extension("bak").exists());
}
