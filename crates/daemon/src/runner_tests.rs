// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use oj_adapters::{
    CommandFactoryRegistry, ContainerLogger, FailingCommandFactory, FakeCommandFactory, FakeEventPublisher,
    FakeMediator,
};
use oj_core::{ContainerId, ContainerStatus, ContainerType, FakeClock, PlayerId};
use oj_storage::{ContainerRepository, MemStore, ShipRepository};

use super::*;

const COMMAND_TYPE: &str = "test_command";

fn fast_tunables() -> Tunables {
    Tunables {
        heartbeat_interval: Duration::from_millis(15),
        stale_threshold: Duration::from_secs(600),
        graceful_stop_timeout: Duration::from_millis(200),
        repository_timeout: Duration::from_secs(5),
        recovery_budget: Duration::from_secs(30),
        clock_drift_buffer: Duration::from_secs(1),
        startup_jitter_max: Duration::ZERO,
        max_restarts: 3,
    }
}

struct Fixture {
    store: Arc<MemStore>,
    runner: Arc<ContainerRunner<FakeClock, MemStore>>,
}

fn build(
    max_iterations: i64,
    max_restarts: u32,
    ship_symbol: Option<&str>,
    factories: CommandFactoryRegistry,
    mediator: FakeMediator,
) -> Fixture {
    let clock = FakeClock::new();
    let store = Arc::new(MemStore::new());
    let id = ContainerId::from_string("run-test-1");
    let player_id = PlayerId::new(1);

    let config = match ship_symbol {
        Some(symbol) => serde_json::json!({ "ship_symbol": symbol }),
        None => serde_json::Value::Null,
    };

    let container = oj_core::Container::new(
        id,
        player_id,
        ContainerType::Navigate,
        COMMAND_TYPE,
        None,
        config,
        max_iterations,
        &clock,
    );
    store.insert(container).unwrap();

    if let Some(symbol) = ship_symbol {
        store.upsert(oj_core::test_support::fake_ship(symbol, 1)).unwrap();
    }

    let container_repo: Arc<dyn ContainerRepository> = store.clone();
    let ship_repo: Arc<dyn ShipRepository> = store.clone();
    let logger = Arc::new(ContainerLogger::new(store.clone()));

    let mut tunables = fast_tunables();
    tunables.max_restarts = max_restarts;

    let runner = ContainerRunner::new(
        id,
        player_id,
        COMMAND_TYPE,
        clock,
        container_repo,
        ship_repo,
        logger,
        Arc::new(mediator),
        Arc::new(factories),
        tunables,
    );

    Fixture { store, runner }
}

fn registry_with_fake() -> CommandFactoryRegistry {
    let mut registry = CommandFactoryRegistry::new();
    registry.register(COMMAND_TYPE, Box::new(FakeCommandFactory::new()));
    registry
}

async fn wait_until(mut predicate: impl FnMut() -> bool) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn start_runs_to_completion_and_releases_ship() {
    let fixture = build(2, 3, Some("X1-TEST-1A"), registry_with_fake(), FakeMediator::always_ok());
    let publisher = Arc::new(FakeEventPublisher::new());
    fixture.runner.set_event_publisher(publisher.clone());

    fixture.runner.start().await.unwrap();

    wait_until(|| {
        fixture.store.get(&fixture.runner.id()).map(|c| c.status) == Some(ContainerStatus::Completed)
    })
    .await;

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert_eq!(container.current_iteration, 2);
    assert_eq!(container.exit_code, Some(0));

    let ship = fixture.store.get(&oj_core::ShipSymbol::new("X1-TEST-1A")).unwrap();
    assert!(ship.container_id.is_none(), "ship must be released on completion");

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].success);
    assert_eq!(events[0].ship_symbol, Some(oj_core::ShipSymbol::new("X1-TEST-1A")));
}

#[tokio::test]
async fn start_is_idempotent() {
    let fixture = build(5, 3, None, registry_with_fake(), FakeMediator::always_ok());
    fixture.runner.start().await.unwrap();
    fixture.runner.start().await.unwrap();
}

#[tokio::test]
async fn start_fails_when_ship_already_assigned_elsewhere() {
    let fixture = build(1, 3, Some("X1-TEST-2A"), registry_with_fake(), FakeMediator::always_ok());
    let mut ship = fixture.store.get(&oj_core::ShipSymbol::new("X1-TEST-2A")).unwrap();
    ship.container_id = Some(ContainerId::from_string("someone-else"));
    fixture.store.upsert(ship).unwrap();

    let err = fixture.runner.start().await.unwrap_err();
    assert!(matches!(err, RunnerError::ReservationConflict(_)));

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert_eq!(container.status, ContainerStatus::Pending, "no partial side effects on reservation failure");
}

#[tokio::test]
async fn terminal_failure_releases_ship_and_publishes_event() {
    let fixture = build(
        10,
        0,
        Some("X1-TEST-3A"),
        registry_with_fake(),
        FakeMediator::always_failing("handler exploded"),
    );
    let publisher = Arc::new(FakeEventPublisher::new());
    fixture.runner.set_event_publisher(publisher.clone());

    fixture.runner.start().await.unwrap();

    wait_until(|| {
        fixture.store.get(&fixture.runner.id()).map(|c| c.status) == Some(ContainerStatus::Failed)
    })
    .await;

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert_eq!(container.exit_code, Some(1));
    assert!(container.exit_reason.as_deref().unwrap().contains("command_execution_failed"));

    let ship = fixture.store.get(&oj_core::ShipSymbol::new("X1-TEST-3A")).unwrap();
    assert!(ship.container_id.is_none());

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert_eq!(events[0].ship_symbol, Some(oj_core::ShipSymbol::new("X1-TEST-3A")));
}

#[tokio::test]
async fn stashed_first_command_satisfies_the_first_iteration_without_a_factory() {
    let fixture = build(1, 3, None, CommandFactoryRegistry::new(), FakeMediator::always_ok());
    fixture.runner.set_first_command(oj_adapters::Command::new(serde_json::json!({})));

    fixture.runner.start().await.unwrap();

    wait_until(|| {
        fixture.store.get(&fixture.runner.id()).map(|c| c.status) == Some(ContainerStatus::Completed)
    })
    .await;
}

#[tokio::test]
async fn unknown_command_type_fails_without_a_factory() {
    let fixture = build(10, 3, None, CommandFactoryRegistry::new(), FakeMediator::always_ok());
    fixture.runner.start().await.unwrap();

    wait_until(|| {
        fixture.store.get(&fixture.runner.id()).map(|c| c.status) == Some(ContainerStatus::Failed)
    })
    .await;

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert!(container.exit_reason.as_deref().unwrap().contains("unknown_command_type"));
}

#[tokio::test]
async fn invalid_config_fails_terminal() {
    let mut registry = CommandFactoryRegistry::new();
    registry.register(COMMAND_TYPE, Box::new(FailingCommandFactory));
    let fixture = build(10, 3, None, registry, FakeMediator::always_ok());
    fixture.runner.start().await.unwrap();

    wait_until(|| {
        fixture.store.get(&fixture.runner.id()).map(|c| c.status) == Some(ContainerStatus::Failed)
    })
    .await;

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert!(container.exit_reason.as_deref().unwrap().contains("invalid_config"));
}

#[tokio::test]
async fn stop_marks_stopped_and_releases_ship() {
    let fixture = build(1_000_000, 3, Some("X1-TEST-4A"), registry_with_fake(), FakeMediator::always_ok());
    fixture.runner.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    fixture.runner.stop().await.unwrap();

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert_eq!(container.status, ContainerStatus::Stopped);

    let ship = fixture.store.get(&oj_core::ShipSymbol::new("X1-TEST-4A")).unwrap();
    assert!(ship.container_id.is_none());
}

#[tokio::test]
async fn interrupt_marks_interrupted() {
    let fixture = build(1_000_000, 3, None, registry_with_fake(), FakeMediator::always_ok());
    fixture.runner.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    fixture.runner.interrupt().await.unwrap();

    let container = fixture.store.get(&fixture.runner.id()).unwrap();
    assert_eq!(container.status, ContainerStatus::Interrupted);
}
