// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key types for the scheduler's one-shot timer map.
//!
//! A [`ScheduledEvent`] is in-memory only (never persisted); the scheduler
//! keys its timer map by `(ship_symbol, kind)` so that re-scheduling the same
//! kind for the same ship cancels and replaces the prior timer.

use crate::ship::ShipSymbol;

/// The two kinds of timed, externally-driven ship state transition the
/// scheduler fires zero-polling timers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledEventKind {
    Arrival,
    Cooldown,
}

crate::simple_display! {
    ScheduledEventKind {
        Arrival => "arrival",
        Cooldown => "cooldown",
    }
}

/// Key identifying one entry in the scheduler's timer map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduledEventKey {
    pub ship_symbol: ShipSymbol,
    pub kind: ScheduledEventKind,
}

impl ScheduledEventKey {
    pub fn arrival(ship_symbol: ShipSymbol) -> Self {
        Self { ship_symbol, kind: ScheduledEventKind::Arrival }
    }

    pub fn cooldown(ship_symbol: ShipSymbol) -> Self {
        Self { ship_symbol, kind: ScheduledEventKind::Cooldown }
    }
}

impl std::fmt::Display for ScheduledEventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.ship_symbol)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
