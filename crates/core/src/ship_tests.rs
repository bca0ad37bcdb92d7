// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::container::ContainerId;
use crate::error::ExitReason;
use crate::player::PlayerId;

fn new_ship() -> Ship {
    Ship::new(ShipSymbol::new("X1-AU21-A1"), PlayerId::new(7))
}

#[test]
fn ship_symbol_from_str_and_string_agree() {
    let a: ShipSymbol = "X1-AU21-A1".into();
    let b: ShipSymbol = "X1-AU21-A1".to_string().into();
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "X1-AU21-A1");
}

#[test]
fn fresh_ship_is_unassigned() {
    let ship = new_ship();
    assert!(!ship.is_assigned());
    assert!(ship.container_id.is_none());
}

#[test]
fn assign_to_container_succeeds_once() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    let id = ContainerId::new("nav", "X1-AU21-A1", &clock);
    ship.assign_to_container(id, &clock).unwrap();
    assert!(ship.is_assigned());
    assert!(ship.is_assigned_to(id));
    assert!(ship.assigned_at.is_some());
    assert!(ship.released_at.is_none());
}

#[test]
fn assign_to_container_is_idempotent_for_same_container() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    let id = ContainerId::new("nav", "X1-AU21-A1", &clock);
    ship.assign_to_container(id, &clock).unwrap();
    let assigned_at = ship.assigned_at;
    clock.advance(std::time::Duration::from_secs(5));
    ship.assign_to_container(id, &clock).unwrap();
    assert_eq!(ship.assigned_at, assigned_at, "re-assignment to the same container must be a no-op");
}

#[test]
fn assign_to_container_conflicts_when_held_by_a_different_container() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    let first = ContainerId::new("nav", "X1-AU21-A1", &clock);
    let second = ContainerId::new("dock", "X1-AU21-A1", &clock);
    ship.assign_to_container(first, &clock).unwrap();

    let err = ship.assign_to_container(second, &clock).unwrap_err();
    match err {
        CoreError::ShipAlreadyAssigned { ship_symbol, current_container } => {
            assert_eq!(ship_symbol, ship.ship_symbol);
            assert_eq!(current_container, first.to_string());
        }
        other => panic!("expected ShipAlreadyAssigned, got {other:?}"),
    }
    assert!(ship.is_assigned_to(first), "a failed assignment must not disturb the existing reservation");
}

#[test]
fn force_release_clears_reservation_and_records_reason() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    let id = ContainerId::new("nav", "X1-AU21-A1", &clock);
    ship.assign_to_container(id, &clock).unwrap();

    ship.force_release(ExitReason::daemon_shutdown(), &clock);
    assert!(!ship.is_assigned());
    assert!(ship.container_id.is_none());
    assert!(ship.released_at.is_some());
    assert_eq!(ship.release_reason.as_deref(), Some("daemon_shutdown"));
}

#[test]
fn force_release_unblocks_a_later_assignment_to_a_different_container() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    let first = ContainerId::new("nav", "X1-AU21-A1", &clock);
    let second = ContainerId::new("dock", "X1-AU21-A1", &clock);

    ship.assign_to_container(first, &clock).unwrap();
    ship.force_release(ExitReason::orphaned_worker(), &clock);
    ship.assign_to_container(second, &clock).unwrap();
    assert!(ship.is_assigned_to(second));
}

#[test]
fn force_release_is_harmless_on_an_already_unassigned_ship() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    ship.force_release(ExitReason::stale_worker(), &clock);
    assert!(!ship.is_assigned());
    assert_eq!(ship.release_reason.as_deref(), Some("stale_worker"));
}

#[test]
fn is_in_transit_requires_both_nav_status_and_arrival_time() {
    let mut ship = new_ship();
    ship.nav_status = NavStatus::InTransit;
    assert!(!ship.is_in_transit(), "no arrival_time recorded yet");

    ship.arrival_time = Some(12345);
    assert!(ship.is_in_transit());

    ship.nav_status = NavStatus::InOrbit;
    assert!(!ship.is_in_transit());
}

#[test]
fn arrive_transitions_to_in_orbit_and_clears_arrival_time() {
    let mut ship = new_ship();
    ship.nav_status = NavStatus::InTransit;
    ship.arrival_time = Some(12345);
    ship.arrive();
    assert_eq!(ship.nav_status, NavStatus::InOrbit);
    assert!(ship.arrival_time.is_none());
}

#[test]
fn clear_cooldown_only_touches_cooldown_expiration() {
    let mut ship = new_ship();
    ship.cooldown_expiration = Some(999);
    ship.nav_status = NavStatus::Docked;
    ship.clear_cooldown();
    assert!(!ship.has_pending_cooldown());
    assert_eq!(ship.nav_status, NavStatus::Docked);
}

#[test]
fn reservation_snapshot_reflects_current_reservation_state() {
    let clock = FakeClock::new();
    let mut ship = new_ship();
    let id = ContainerId::new("nav", "X1-AU21-A1", &clock);
    ship.assign_to_container(id, &clock).unwrap();

    let snapshot = ship.reservation_snapshot();
    assert_eq!(snapshot.ship_symbol, ship.ship_symbol);
    assert_eq!(snapshot.container_id, Some(id));
    assert_eq!(snapshot.assigned_at, ship.assigned_at);
    assert!(snapshot.released_at.is_none());
}

#[yare::parameterized(
    docked = { NavStatus::Docked, "docked" },
    in_orbit = { NavStatus::InOrbit, "in_orbit" },
    in_transit = { NavStatus::InTransit, "in_transit" },
)]
fn nav_status_displays_as_snake_case(status: NavStatus, expected: &str) {
    assert_eq!(status.to_string(), expected);
}

mod reservation_uniqueness_property {
    use super::*;
    use crate::test_support::strategies::arb_ship_symbol;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn at_most_one_active_container_holds_a_given_ship(symbol in arb_ship_symbol()) {
            let clock = FakeClock::new();
            let mut ship = Ship::new(ShipSymbol::new(&symbol), PlayerId::new(1));
            let a = ContainerId::new("nav", &symbol, &clock);
            let b = ContainerId::new("dock", &symbol, &clock);

            ship.assign_to_container(a, &clock).unwrap();
            prop_assert!(ship.assign_to_container(b, &clock).is_err());
            prop_assert!(ship.is_assigned_to(a));
        }
    }
}
