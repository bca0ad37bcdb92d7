// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer-driven advancement of per-ship derived state (§4.6): arrival and
//! cooldown clearance fire at the absolute timestamps the external API
//! returns, with zero polling between events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use oj_core::{Clock, Ship, ScheduledEventKey};
use oj_storage::ShipRepository;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

pub struct Scheduler<C> {
    clock: C,
    ship_repo: Arc<dyn ShipRepository>,
    clock_drift_buffer: Duration,
    timers: Mutex<HashMap<ScheduledEventKey, JoinHandle<()>>>,
}

impl<C> Scheduler<C>
where
    C: Clock + 'static,
{
    pub fn new(clock: C, ship_repo: Arc<dyn ShipRepository>, clock_drift_buffer: Duration) -> Arc<Self> {
        Arc::new(Self { clock, ship_repo, clock_drift_buffer, timers: Mutex::new(HashMap::new()) })
    }

    /// Number of outstanding timers, for observability/tests.
    pub fn pending_count(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn schedule_arrival(self: &Arc<Self>, ship: &Ship) {
        let Some(arrival_time) = ship.arrival_time else { return };
        self.schedule(ScheduledEventKey::arrival(ship.ship_symbol), arrival_time, Fire::Arrival);
    }

    pub fn schedule_cooldown_clear(self: &Arc<Self>, ship: &Ship) {
        let Some(cooldown_expiration) = ship.cooldown_expiration else { return };
        self.schedule(ScheduledEventKey::cooldown(ship.ship_symbol), cooldown_expiration, Fire::Cooldown);
    }

    /// On startup: reschedule every ship still in-transit or with a pending
    /// cooldown. Past-due timers fire immediately.
    pub fn schedule_all_pending(self: &Arc<Self>) {
        for ship in self.ship_repo.list_in_transit() {
            self.schedule_arrival(&ship);
        }
        for ship in self.ship_repo.list_with_pending_cooldown() {
            self.schedule_cooldown_clear(&ship);
        }
    }

    /// On shutdown: cancel every outstanding timer.
    pub fn cancel_all(&self) {
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }

    fn schedule(self: &Arc<Self>, key: ScheduledEventKey, fire_at_ms: u64, fire: Fire) {
        let target_ms = fire_at_ms.saturating_add(self.clock_drift_buffer.as_millis() as u64);
        let now_ms = self.clock.epoch_ms();
        let delay = Duration::from_millis(target_ms.saturating_sub(now_ms));

        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(key, fire);
            this.timers.lock().remove(&key);
        });

        if let Some(previous) = self.timers.lock().insert(key, handle) {
            previous.abort();
        }
    }

    fn fire(&self, key: ScheduledEventKey, fire: Fire) {
        let Some(mut ship) = self.ship_repo.get(&key.ship_symbol) else { return };
        let applied = match fire {
            Fire::Arrival if ship.is_in_transit() => {
                ship.arrive();
                true
            }
            Fire::Cooldown if ship.has_pending_cooldown() => {
                ship.clear_cooldown();
                true
            }
            _ => false,
        };
        if !applied {
            return;
        }
        if let Err(e) = self.ship_repo.upsert(ship) {
            tracing::warn!(%key, error = %e, "failed to persist scheduled ship transition");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Fire {
    Arrival,
    Cooldown,
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
