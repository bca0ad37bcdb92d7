// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::clock::FakeClock;
use crate::container::{Container, ContainerId, ContainerType};
use crate::player::PlayerId;
use crate::ship::{NavStatus, Ship, ShipSymbol};

/// Proptest strategies for core domain types, used by the quantified
/// properties in the testable-properties suite (ship reservation uniqueness,
/// scheduler idempotence/precondition).
pub mod strategies {
    use crate::container::ContainerType;
    use proptest::prelude::*;

    pub fn arb_container_type() -> impl Strategy<Value = ContainerType> {
        prop_oneof![
            Just(ContainerType::Scout),
            Just(ContainerType::Trading),
            Just(ContainerType::Navigate),
            Just(ContainerType::MiningCoordinator),
            Just(ContainerType::MiningWorker),
            Just(ContainerType::GasCoordinator),
            Just(ContainerType::ManufacturingCoordinator),
            Just(ContainerType::ManufacturingTaskWorker),
        ]
    }

    pub fn arb_ship_symbol() -> impl Strategy<Value = String> {
        "[A-Z][0-9]-[A-Z]{2}[0-9]{2}-[A-Z][0-9]".prop_map(|s| s)
    }
}

pub fn fake_container(
    id: &str,
    player_id: i64,
    container_type: ContainerType,
    clock: &FakeClock,
) -> Container {
    Container::new(
        ContainerId::from_string(id),
        PlayerId::new(player_id),
        container_type,
        container_type.to_string(),
        None,
        serde_json::Value::Null,
        1,
        clock,
    )
}

pub fn fake_worker(
    id: &str,
    parent_id: &str,
    player_id: i64,
    container_type: ContainerType,
    clock: &FakeClock,
) -> Container {
    Container::new(
        ContainerId::from_string(id),
        PlayerId::new(player_id),
        container_type,
        container_type.to_string(),
        Some(ContainerId::from_string(parent_id)),
        serde_json::Value::Null,
        1,
        clock,
    )
}

pub fn fake_ship(symbol: &str, player_id: i64) -> Ship {
    let mut ship = Ship::new(ShipSymbol::new(symbol), PlayerId::new(player_id));
    ship.nav_status = NavStatus::Docked;
    ship
}

pub fn fake_ship_in_transit(symbol: &str, player_id: i64, arrival_time: u64) -> Ship {
    let mut ship = fake_ship(symbol, player_id);
    ship.nav_status = NavStatus::InTransit;
    ship.arrival_time = Some(arrival_time);
    ship
}
