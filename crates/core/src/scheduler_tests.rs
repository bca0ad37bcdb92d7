// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ship::ShipSymbol;

#[test]
fn arrival_and_cooldown_keys_for_the_same_ship_are_distinct() {
    let symbol = ShipSymbol::new("X1-AU21-A1");
    let arrival = ScheduledEventKey::arrival(symbol);
    let cooldown = ScheduledEventKey::cooldown(symbol);
    assert_ne!(arrival, cooldown);
    assert_eq!(arrival.ship_symbol, cooldown.ship_symbol);
}

#[test]
fn rescheduling_the_same_kind_for_the_same_ship_yields_the_same_key() {
    let symbol = ShipSymbol::new("X1-AU21-A1");
    let a = ScheduledEventKey::arrival(symbol);
    let b = ScheduledEventKey::arrival(symbol);
    assert_eq!(a, b, "the scheduler relies on this to cancel+replace the prior timer");
}

#[test]
fn display_format_is_kind_colon_ship_symbol() {
    let symbol = ShipSymbol::new("X1-AU21-A1");
    assert_eq!(ScheduledEventKey::arrival(symbol).to_string(), "arrival:X1-AU21-A1");
    assert_eq!(ScheduledEventKey::cooldown(symbol).to_string(), "cooldown:X1-AU21-A1");
}

#[test]
fn keys_are_usable_as_hash_map_entries() {
    use std::collections::HashMap;
    let symbol = ShipSymbol::new("X1-AU21-A1");
    let mut timers: HashMap<ScheduledEventKey, u64> = HashMap::new();
    timers.insert(ScheduledEventKey::arrival(symbol), 100);
    timers.insert(ScheduledEventKey::arrival(symbol), 200);
    assert_eq!(timers.len(), 1, "re-inserting the same key must replace, not duplicate");
    assert_eq!(timers[&ScheduledEventKey::arrival(symbol)], 200);
}
