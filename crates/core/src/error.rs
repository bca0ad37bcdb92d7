// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the domain types that live in this crate.
//!
//! Errors that belong to collaborators outside the pure domain model
//! (repository I/O, mediator dispatch, recovery) are defined in the crates
//! that own those collaborators and typically wrap a [`CoreError`] variant.

use crate::container::ContainerStatus;
use crate::ship::ShipSymbol;
use thiserror::Error;

/// Errors raised by the container state machine and the ship reservation
/// aggregate — the parts of the domain model that enforce their own
/// invariants without any I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid transition: cannot {action} from status {from}")]
    InvalidTransition { action: &'static str, from: ContainerStatus },

    #[error("max_iterations exceeded: current_iteration {current} > max_iterations {max}")]
    MaxIterationsExceeded { current: i64, max: i64 },

    #[error("ship {ship_symbol} already assigned to container {current_container}")]
    ShipAlreadyAssigned { ship_symbol: ShipSymbol, current_container: String },
}

/// The short snake_case token recorded as `exit_reason` alongside a
/// human-readable suffix, per the terminal-status contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReason(String);

impl ExitReason {
    pub fn new(token: &'static str, detail: impl std::fmt::Display) -> Self {
        Self(format!("{token}: {detail}"))
    }

    pub fn token_only(token: &'static str) -> Self {
        Self(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn daemon_shutdown() -> Self {
        Self::token_only("daemon_shutdown")
    }

    pub fn daemon_restart() -> Self {
        Self::token_only("daemon_restart")
    }

    pub fn orphaned_worker() -> Self {
        Self::token_only("orphaned_worker")
    }

    pub fn stale_worker() -> Self {
        Self::token_only("stale_worker")
    }

    pub fn invalid_config(detail: impl std::fmt::Display) -> Self {
        Self::new("invalid_config", detail)
    }

    pub fn unknown_command_type(command_type: &str) -> Self {
        Self::new("unknown_command_type", command_type)
    }

    pub fn recovery_failed(detail: impl std::fmt::Display) -> Self {
        Self::new("recovery_failed", detail)
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ExitReason {
    fn from(token: &'static str) -> Self {
        Self::token_only(token)
    }
}
