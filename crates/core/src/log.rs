// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container log entries — append-only, keyed by `(container_id, player_id, timestamp)`.

use crate::container::ContainerId;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Severity, shared with the `tracing` vocabulary so a container log line
/// persisted to the store and the same line emitted through `tracing` agree
/// on what "warn" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Trace => "trace",
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

impl LogLevel {
    pub fn from_tracing(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub container_id: ContainerId,
    pub player_id: PlayerId,
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(
        container_id: ContainerId,
        player_id: PlayerId,
        timestamp_ms: u64,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self { container_id, player_id, timestamp_ms, level, message: message.into(), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
