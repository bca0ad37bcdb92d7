// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use oj_core::{Container, ContainerId, ContainerStatus, ContainerType, FakeClock, PlayerId};
use oj_storage::{ContainerRepository, MemStore, ShipRepository};

use super::*;

fn fast_tunables() -> Tunables {
    Tunables {
        heartbeat_interval: Duration::from_secs(30),
        stale_threshold: Duration::from_secs(10 * 60),
        graceful_stop_timeout: Duration::from_secs(10),
        repository_timeout: Duration::from_secs(5),
        recovery_budget: Duration::from_secs(30),
        clock_drift_buffer: Duration::from_secs(1),
        startup_jitter_max: Duration::ZERO,
        max_restarts: 3,
    }
}

fn running_worker(clock: &FakeClock, id: &str, container_type: ContainerType, ship_symbol: &str) -> Container {
    let mut container = Container::new(
        ContainerId::from_string(id),
        PlayerId::new(1),
        container_type,
        "manufacture",
        None,
        serde_json::json!({ "ship_symbol": ship_symbol }),
        -1,
        clock,
    );
    container.start(clock).unwrap();
    container
}

#[test]
fn reclaims_manufacturing_worker_past_the_stale_threshold() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let store = Arc::new(MemStore::new());

    let container = running_worker(&clock, "stale-1", ContainerType::ManufacturingTaskWorker, "X1-STALE-1A");
    store.insert(container).unwrap();
    store.upsert(oj_core::test_support::fake_ship("X1-STALE-1A", 1)).unwrap();
    let ship_symbol = oj_core::ShipSymbol::new("X1-STALE-1A");
    let mut ship = store.get(&ship_symbol).unwrap();
    ship.container_id = Some(ContainerId::from_string("stale-1"));
    store.upsert(ship).unwrap();

    clock.set_epoch_ms(1_000_000 + Duration::from_secs(15 * 60).as_millis() as u64);

    let container_repo: Arc<dyn ContainerRepository> = store.clone();
    let ship_repo: Arc<dyn ShipRepository> = store.clone();
    let detector = StaleDetector::new(clock, container_repo, ship_repo, fast_tunables());

    assert_eq!(detector.sweep(), 1);

    let container = store.get(&ContainerId::from_string("stale-1")).unwrap();
    assert_eq!(container.status, ContainerStatus::Failed);
    assert_eq!(container.exit_reason.as_deref(), Some("stale_worker"));

    let ship = store.get(&ship_symbol).unwrap();
    assert!(ship.container_id.is_none());
}

#[test]
fn leaves_fresh_heartbeats_alone() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let store = Arc::new(MemStore::new());

    let mut container = running_worker(&clock, "stale-2", ContainerType::ManufacturingTaskWorker, "X1-STALE-2A");
    container.record_heartbeat(&clock);
    store.insert(container).unwrap();

    clock.set_epoch_ms(1_000_000 + Duration::from_secs(60).as_millis() as u64);

    let container_repo: Arc<dyn ContainerRepository> = store.clone();
    let ship_repo: Arc<dyn ShipRepository> = store.clone();
    let detector = StaleDetector::new(clock, container_repo, ship_repo, fast_tunables());

    assert_eq!(detector.sweep(), 0);
    let container = store.get(&ContainerId::from_string("stale-2")).unwrap();
    assert_eq!(container.status, ContainerStatus::Running);
}

#[test]
fn ignores_stale_running_rows_of_other_container_types() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let store = Arc::new(MemStore::new());

    let container = running_worker(&clock, "stale-3", ContainerType::Navigate, "X1-STALE-3A");
    store.insert(container).unwrap();

    clock.set_epoch_ms(1_000_000 + Duration::from_secs(20 * 60).as_millis() as u64);

    let container_repo: Arc<dyn ContainerRepository> = store.clone();
    let ship_repo: Arc<dyn ShipRepository> = store.clone();
    let detector = StaleDetector::new(clock, container_repo, ship_repo, fast_tunables());

    assert_eq!(detector.sweep(), 0);
}
