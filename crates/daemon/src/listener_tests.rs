// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use oj_adapters::{CommandFactoryRegistry, FakeCommandFactory, FakeMediator};
use oj_core::{ContainerType, FakeClock, PlayerId};
use oj_storage::{ContainerRepository, MemStore, ShipRepository};

use super::*;

const COMMAND_TYPE: &str = "manufacturing_coordinator";

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

fn build_server(store: Arc<MemStore>) -> Arc<DaemonServer<FakeClock, MemStore>> {
    let container_repo: Arc<dyn ContainerRepository> = store.clone();
    let ship_repo: Arc<dyn ShipRepository> = store.clone();
    let logger = Arc::new(oj_adapters::ContainerLogger::new(store));
    let mut registry = CommandFactoryRegistry::new();
    registry.register(COMMAND_TYPE, Box::new(FakeCommandFactory::new()));
    DaemonServer::new(
        FakeClock::new(),
        container_repo,
        ship_repo,
        logger,
        Arc::new(FakeMediator::always_ok()),
        Arc::new(registry),
        fast_tunables(),
        None,
    )
}

fn create_request(player_id: i64, system_symbol: &str) -> Request {
    Request::CreateContainer {
        container_type: ContainerType::ManufacturingCoordinator,
        player_id: Some(player_id),
        agent_symbol: None,
        parent_container_id: None,
        config: serde_json::json!({ "system_symbol": system_symbol }),
        max_iterations: -1,
        dry_run: false,
    }
}

#[test]
fn resolve_player_accepts_a_nonzero_player_id() {
    assert_eq!(resolve_player(Some(7), None).unwrap(), PlayerId::new(7));
}

#[test]
fn resolve_player_rejects_a_bare_agent_symbol() {
    let err = resolve_player(None, Some("MY_AGENT".to_string())).unwrap_err();
    assert!(matches!(err, ServerError::UnresolvedPlayer(s) if s == "MY_AGENT"));
}

#[test]
fn resolve_player_rejects_a_zero_player_id() {
    assert!(resolve_player(Some(0), None).is_err());
}

#[test]
fn singleton_key_for_manufacturing_coordinator_reads_system_symbol_from_config() {
    let player_id = PlayerId::new(1);
    let config = serde_json::json!({ "system_symbol": "X1" });
    let key = singleton_key_for(ContainerType::ManufacturingCoordinator, player_id, &config);
    assert_eq!(
        key,
        Some(oj_core::SingletonKey::ManufacturingCoordinator { player_id, system_symbol: "X1".to_string() })
    );
}

#[test]
fn singleton_key_for_non_singleton_types_is_none() {
    let config = serde_json::Value::Null;
    assert_eq!(singleton_key_for(ContainerType::Navigate, PlayerId::new(1), &config), None);
}

#[tokio::test]
async fn create_container_through_dispatch_round_trips_to_containers_response() {
    let store = Arc::new(MemStore::new());
    let server = build_server(store);

    let create = dispatch(&server, create_request(1, "X1")).await;
    let container_id = match create {
        Response::ContainerCreated { container_id, status } => {
            assert_eq!(status, oj_core::ContainerStatus::Running);
            container_id
        }
        other => panic!("unexpected response: {other:?}"),
    };

    let list = dispatch(&server, Request::ListContainers { player_id: Some(1), status: None }).await;
    match list {
        Response::Containers { containers } => {
            assert_eq!(containers.len(), 1);
            assert_eq!(containers[0].id, container_id);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    let get = dispatch(&server, Request::GetContainer { id: container_id.clone() }).await;
    match get {
        Response::Container { container: Some(container), .. } => assert_eq!(container.id, container_id),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn get_container_on_an_unknown_id_returns_none_not_an_error() {
    let store = Arc::new(MemStore::new());
    let server = build_server(store);

    let response = dispatch(&server, Request::GetContainer { id: "nope".to_string() }).await;
    assert!(matches!(response, Response::Container { container: None, .. }));
}

#[tokio::test]
async fn create_container_with_an_unresolvable_agent_symbol_is_an_error_response() {
    let store = Arc::new(MemStore::new());
    let server = build_server(store);

    let response = dispatch(
        &server,
        Request::CreateContainer {
            container_type: ContainerType::ManufacturingCoordinator,
            player_id: None,
            agent_symbol: Some("MY_AGENT".to_string()),
            parent_container_id: None,
            config: serde_json::Value::Null,
            max_iterations: 1,
            dry_run: false,
        },
    )
    .await;
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn health_check_reports_the_active_container_count() {
    let store = Arc::new(MemStore::new());
    let server = build_server(store);

    dispatch(&server, create_request(1, "X1")).await;

    let response = dispatch(&server, Request::HealthCheck).await;
    match response {
        Response::Health { active_container_count, .. } => assert_eq!(active_container_count, 1),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn stop_container_through_dispatch_reports_stopped_status() {
    let store = Arc::new(MemStore::new());
    let server = build_server(store);

    let create = dispatch(&server, create_request(1, "X1")).await;
    let container_id = match create {
        Response::ContainerCreated { container_id, .. } => container_id,
        other => panic!("unexpected response: {other:?}"),
    };

    let response = dispatch(&server, Request::StopContainer { id: container_id }).await;
    match response {
        Response::ContainerStopped { status, .. } => assert_eq!(status, oj_core::ContainerStatus::Stopped),
        other => panic!("unexpected response: {other:?}"),
    }
}
