// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkerCompletedEvent` publishing (§4.2, §6). A runner publishes one on
//! terminal exit so a parent coordinator can learn a worker's ship is free
//! without polling; publishing is optional and best-effort.

use async_trait::async_trait;
use oj_core::{ContainerId, PlayerId, ShipSymbol};

/// Emitted once, on terminal exit, after reservations have already been
/// released (§4.2's ordering requirement).
#[derive(Debug, Clone)]
pub struct WorkerCompletedEvent {
    pub container_id: ContainerId,
    pub player_id: PlayerId,
    pub ship_symbol: Option<ShipSymbol>,
    pub coordinator_id: Option<ContainerId>,
    pub success: bool,
    pub error: Option<String>,
}

/// Sink a runner publishes completion events to. Implementations must not
/// block the runner's exit path; a slow subscriber should buffer internally.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish(&self, event: WorkerCompletedEvent);
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{EventPublisher, WorkerCompletedEvent};

    /// Test-support publisher recording every event it receives.
    #[derive(Clone, Default)]
    pub struct FakeEventPublisher {
        events: Arc<Mutex<Vec<WorkerCompletedEvent>>>,
    }

    impl FakeEventPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<WorkerCompletedEvent> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for FakeEventPublisher {
        async fn publish(&self, event: WorkerCompletedEvent) {
            self.events.lock().push(event);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEventPublisher;

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
