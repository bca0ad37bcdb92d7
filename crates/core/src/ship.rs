// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ship aggregate: navigation/cooldown state plus the advisory exclusive
//! reservation that binds a ship to at most one container at a time.

use crate::clock::Clock;
use crate::container::ContainerId;
use crate::error::{CoreError, ExitReason};
use crate::id::IdBuf;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// A ship symbol as returned by the external game API (e.g. `"X1-AU21-A1"`).
/// Opaque to core beyond equality/ordering/hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipSymbol(IdBuf);

impl ShipSymbol {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(IdBuf::new(symbol.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ShipSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShipSymbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ShipSymbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for ShipSymbol {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl std::ops::Deref for ShipSymbol {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

/// Navigation status of a ship, as reported by the external game API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavStatus {
    Docked,
    InOrbit,
    InTransit,
}

crate::simple_display! {
    NavStatus {
        Docked => "docked",
        InOrbit => "in_orbit",
        InTransit => "in_transit",
    }
}

/// A read-model snapshot of a ship's reservation, independent of its full
/// navigation state. Used for audit queries (`findByContainer`) where the
/// caller only cares who holds or held the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipReservation {
    pub ship_symbol: ShipSymbol,
    pub player_id: PlayerId,
    pub container_id: Option<ContainerId>,
    pub assigned_at: Option<u64>,
    pub released_at: Option<u64>,
    pub release_reason: Option<String>,
}

/// The ship aggregate (external source of truth, core only mutates the
/// reservation fields and the two narrow state transitions it's responsible
/// for driving: arrival and cooldown clearance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub ship_symbol: ShipSymbol,
    pub player_id: PlayerId,
    pub current_location: String,
    pub nav_status: NavStatus,
    pub cargo: serde_json::Value,
    pub fuel: serde_json::Value,
    pub arrival_time: Option<u64>,
    pub cooldown_expiration: Option<u64>,

    // Reservation fields (advisory exclusive lock), (I6).
    pub container_id: Option<ContainerId>,
    pub assigned_at: Option<u64>,
    pub released_at: Option<u64>,
    pub release_reason: Option<String>,
}

impl Ship {
    pub fn new(ship_symbol: impl Into<ShipSymbol>, player_id: PlayerId) -> Self {
        Self {
            ship_symbol: ship_symbol.into(),
            player_id,
            current_location: String::new(),
            nav_status: NavStatus::Docked,
            cargo: serde_json::Value::Null,
            fuel: serde_json::Value::Null,
            arrival_time: None,
            cooldown_expiration: None,
            container_id: None,
            assigned_at: None,
            released_at: None,
            release_reason: None,
        }
    }

    pub fn is_in_transit(&self) -> bool {
        matches!(self.nav_status, NavStatus::InTransit) && self.arrival_time.is_some()
    }

    pub fn has_pending_cooldown(&self) -> bool {
        self.cooldown_expiration.is_some()
    }

    pub fn is_assigned(&self) -> bool {
        self.container_id.is_some()
    }

    pub fn is_assigned_to(&self, container_id: ContainerId) -> bool {
        self.container_id == Some(container_id)
    }

    /// Reserve the ship for `container_id`. Idempotent when already assigned
    /// to the same container (the recovery re-acquire case, L3); fails with
    /// [`CoreError::ShipAlreadyAssigned`] when held by a different container.
    pub fn assign_to_container(
        &mut self,
        container_id: ContainerId,
        clock: &impl Clock,
    ) -> Result<(), CoreError> {
        if let Some(existing) = self.container_id {
            if existing == container_id {
                return Ok(());
            }
            return Err(CoreError::ShipAlreadyAssigned {
                ship_symbol: self.ship_symbol,
                current_container: existing.to_string(),
            });
        }
        self.container_id = Some(container_id);
        self.assigned_at = Some(clock.epoch_ms());
        self.released_at = None;
        self.release_reason = None;
        Ok(())
    }

    /// Unconditionally release the reservation, used on every terminal exit
    /// path (success, failure-no-retry, cancellation, stale sweep, orphan
    /// cleanup, daemon shutdown/restart).
    pub fn force_release(&mut self, reason: ExitReason, clock: &impl Clock) {
        self.container_id = None;
        self.released_at = Some(clock.epoch_ms());
        self.release_reason = Some(reason.to_string());
    }

    /// Apply the arrival transition. Callers must have already verified
    /// `is_in_transit()` still holds (the scheduler's firing precondition).
    pub fn arrive(&mut self) {
        self.nav_status = NavStatus::InOrbit;
        self.arrival_time = None;
    }

    /// Apply the cooldown-clear transition. Callers must have already
    /// verified `has_pending_cooldown()` still holds.
    pub fn clear_cooldown(&mut self) {
        self.cooldown_expiration = None;
    }

    pub fn reservation_snapshot(&self) -> ShipReservation {
        ShipReservation {
            ship_symbol: self.ship_symbol,
            player_id: self.player_id,
            container_id: self.container_id,
            assigned_at: self.assigned_at,
            released_at: self.released_at,
            release_reason: self.release_reason.clone(),
        }
    }
}

#[cfg(test)]
#[path = "ship_tests.rs"]
mod tests;
