// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::{ContainerId, PlayerId};

use super::*;

fn fake_container_id(seed: &str) -> ContainerId {
    ContainerId::from_string(format!("test-{seed}"))
}

#[tokio::test]
async fn fake_publisher_records_every_event_in_order() {
    let publisher = FakeEventPublisher::new();

    publisher
        .publish(WorkerCompletedEvent {
            container_id: fake_container_id("a"),
            player_id: PlayerId::new(1),
            ship_symbol: None,
            coordinator_id: None,
            success: true,
            error: None,
        })
        .await;
    publisher
        .publish(WorkerCompletedEvent {
            container_id: fake_container_id("b"),
            player_id: PlayerId::new(1),
            ship_symbol: None,
            coordinator_id: None,
            success: false,
            error: Some("boom".into()),
        })
        .await;

    let events = publisher.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].container_id, fake_container_id("a"));
    assert!(events[0].success);
    assert_eq!(events[1].container_id, fake_container_id("b"));
    assert!(!events[1].success);
    assert_eq!(events[1].error.as_deref(), Some("boom"));
}
