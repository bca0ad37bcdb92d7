// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the orchestration subsystem (§7), layered on top of
//! [`oj_core::CoreError`] and [`oj_storage::StorageError`].

use oj_core::{ContainerId, CoreError, ShipSymbol};
use oj_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Repository(#[from] StorageError),

    #[error("container {0} has no persisted row")]
    MissingContainer(ContainerId),

    #[error("ship {0} already assigned to another container")]
    ReservationConflict(ShipSymbol),

    #[error("no ship row for symbol {0}")]
    UnknownShip(ShipSymbol),

    #[error("command execution failed: {0}")]
    CommandExecution(String),

    #[error(transparent)]
    Mediator(#[from] oj_adapters::MediatorError),

    #[error(transparent)]
    Factory(#[from] oj_adapters::FactoryError),

    #[error("no command factory registered for command_type {0:?}")]
    UnknownCommandType(String),
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Repository(#[from] StorageError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Repository(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Repository(#[from] StorageError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("no container with id {0}")]
    NotFound(String),

    #[error("player symbol {0:?} could not be resolved")]
    UnresolvedPlayer(String),
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Protocol(#[from] oj_wire::ProtocolError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire daemon lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Repository(#[from] StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
