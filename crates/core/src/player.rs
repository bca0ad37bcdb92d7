// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant identifier.

use serde::{Deserialize, Serialize};

/// Identifies the tenant ("agent"/player) a container or ship belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl PlayerId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// `true` when unresolved — the RPC surface accepts an `agent_symbol`
    /// and the server resolves it to an id, treating zero as "not yet resolved".
    pub fn is_unresolved(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PlayerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
