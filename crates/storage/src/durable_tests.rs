// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::test_support::fake_container;
use oj_core::{ContainerStatus, ContainerType, FakeClock};
use tempfile::tempdir;

#[test]
fn insert_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let store = DurableStore::open(dir.path()).unwrap();

    let c = fake_container("nav-X1-1", 7, ContainerType::Navigate, &clock);
    store.insert(c.clone()).unwrap();

    assert_eq!(store.get(&c.id), Some(c));
}

#[test]
fn state_survives_reopen_via_wal_replay() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let c = fake_container("nav-X1-1", 7, ContainerType::Navigate, &clock);

    {
        let store = DurableStore::open(dir.path()).unwrap();
        store.insert(c.clone()).unwrap();
    }

    let reopened = DurableStore::open(dir.path()).unwrap();
    assert_eq!(reopened.get(&c.id), Some(c));
}

#[test]
fn checkpoint_then_reopen_reads_state_from_the_snapshot() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let c = fake_container("nav-X1-1", 7, ContainerType::Navigate, &clock);

    {
        let store = DurableStore::open(dir.path()).unwrap();
        store.insert(c.clone()).unwrap();
        store.checkpoint().unwrap();
    }

    assert!(dir.path().join("snapshot.zst").exists());

    let reopened = DurableStore::open(dir.path()).unwrap();
    assert_eq!(reopened.get(&c.id), Some(c));
}

#[test]
fn update_on_a_row_that_was_never_inserted_fails_without_writing_to_the_wal() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let store = DurableStore::open(dir.path()).unwrap();
    let c = fake_container("nav-X1-1", 7, ContainerType::Navigate, &clock);

    assert!(matches!(store.update(c), Err(StorageError::NotFound(_))));
}

#[test]
fn update_after_insert_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut c = fake_container("nav-X1-1", 7, ContainerType::Navigate, &clock);

    {
        let store = DurableStore::open(dir.path()).unwrap();
        store.insert(c.clone()).unwrap();
        c.status = ContainerStatus::Running;
        store.update(c.clone()).unwrap();
    }

    let reopened = DurableStore::open(dir.path()).unwrap();
    assert_eq!(reopened.get(&c.id).unwrap().status, ContainerStatus::Running);
}

#[test]
fn create_if_no_active_worker_respects_the_singleton_key_across_reopen() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let key = oj_core::SingletonKey::ContractWorkflow { player_id: oj_core::PlayerId::new(7) };

    {
        let store = DurableStore::open(dir.path()).unwrap();
        let mut first = fake_container("cwf-1", 7, ContainerType::ContractWorkflow, &clock);
        first.status = ContainerStatus::Running;
        assert!(store.create_if_no_active_worker(&key, first).unwrap());
    }

    let reopened = DurableStore::open(dir.path()).unwrap();
    let second = fake_container("cwf-2", 7, ContainerType::ContractWorkflow, &clock);
    assert!(!reopened.create_if_no_active_worker(&key, second).unwrap());
}

#[test]
fn shutdown_checkpoints_and_is_idempotent_to_replay_on_reopen() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let c = fake_container("nav-X1-1", 7, ContainerType::Navigate, &clock);

    {
        let store = DurableStore::open(dir.path()).unwrap();
        store.insert(c.clone()).unwrap();
        store.shutdown().unwrap();
    }

    let reopened = DurableStore::open(dir.path()).unwrap();
    assert_eq!(reopened.get(&c.id), Some(c));
}
