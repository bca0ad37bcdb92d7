// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-stable DTOs, decoupled from `oj_core`'s internal entity representation.

use oj_core::{ContainerStatus, ContainerType, LogLevel};
use serde::{Deserialize, Serialize};

/// Snapshot of one container, as returned by `getContainer`/`listContainers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerInfo {
    pub id: String,
    pub player_id: i64,
    pub container_type: ContainerType,
    pub command_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_container_id: Option<String>,
    pub status: ContainerStatus,
    pub current_iteration: i64,
    pub max_iterations: i64,
    pub restart_count: u32,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub stopped_at: Option<u64>,
    pub heartbeat_at: Option<u64>,
    pub exit_code: Option<i32>,
    pub exit_reason: Option<String>,
}

impl From<&oj_core::Container> for ContainerInfo {
    fn from(c: &oj_core::Container) -> Self {
        ContainerInfo {
            id: c.id.to_string(),
            player_id: c.player_id.0,
            container_type: c.container_type,
            command_type: c.command_type.clone(),
            parent_container_id: c.parent_container_id.map(|id| id.to_string()),
            status: c.status,
            current_iteration: c.current_iteration,
            max_iterations: c.max_iterations,
            restart_count: c.restart_count,
            created_at: c.created_at,
            started_at: c.started_at,
            stopped_at: c.stopped_at,
            heartbeat_at: c.heartbeat_at,
            exit_code: c.exit_code,
            exit_reason: c.exit_reason.clone(),
        }
    }
}

/// One persisted log line, as returned by `getContainerLogs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntryWire {
    pub container_id: String,
    pub player_id: i64,
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl From<&oj_core::LogEntry> for LogEntryWire {
    fn from(e: &oj_core::LogEntry) -> Self {
        LogEntryWire {
            container_id: e.container_id.to_string(),
            player_id: e.player_id.0,
            timestamp_ms: e.timestamp_ms,
            level: e.level,
            message: e.message.clone(),
            metadata: e.metadata.clone(),
        }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
