// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses the daemon sends back for each [`crate::Request`].

use crate::types::{ContainerInfo, LogEntryWire};
use oj_core::ContainerStatus;
use serde::{Deserialize, Serialize};

/// Response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success with no payload.
    Ok,

    /// Version handshake response.
    Hello { version: String },

    /// `createContainer` accepted; carries the generated id and starting status.
    ContainerCreated { container_id: String, status: ContainerStatus },

    /// `listContainers` result.
    Containers { containers: Vec<ContainerInfo> },

    /// `getContainer` result; `None` when the id is unknown.
    Container {
        container: Option<Box<ContainerInfo>>,
        #[serde(default)]
        metadata: serde_json::Value,
    },

    /// `stopContainer` result.
    ContainerStopped { status: ContainerStatus, message: String },

    /// `getContainerLogs` result.
    ContainerLogs { entries: Vec<LogEntryWire> },

    /// `healthCheck` result.
    Health { status: String, version: String, active_container_count: usize, uptime_secs: u64 },

    /// Request-level failure (unknown id, invalid config, dispatch error).
    Error { message: String },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
