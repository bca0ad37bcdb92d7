// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC requests accepted by the daemon's socket listener.

use oj_core::{ContainerStatus, ContainerType, LogLevel};
use serde::{Deserialize, Serialize};

fn default_max_iterations() -> i64 {
    1
}

/// One request frame sent from a client (the `oj` CLI, or any other caller)
/// to the daemon over the Unix socket.
///
/// `CreateContainer` stands in for the "one method per container type" RPC
/// surface: every concrete create call (scout, navigate, mining coordinator,
/// ...) is the same request shape parameterized by `container_type`. Callers
/// accept either `player_id` or `agent_symbol`; the daemon resolves
/// `agent_symbol` to a player id when `player_id` is absent or zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    CreateContainer {
        container_type: ContainerType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_symbol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_container_id: Option<String>,
        #[serde(default)]
        config: serde_json::Value,
        #[serde(default = "default_max_iterations")]
        max_iterations: i64,
        /// Bypasses the singleton check for types where §4.3's table allows
        /// it (`gas_coordinator`); ignored for every other type.
        #[serde(default)]
        dry_run: bool,
    },

    ListContainers {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<ContainerStatus>,
    },

    GetContainer {
        id: String,
    },

    StopContainer {
        id: String,
    },

    GetContainerLogs {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<LogLevel>,
    },

    HealthCheck,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
