// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps a persisted `command_type` string and JSON config back into a
//! typed [`Command`] a [`crate::mediator::Mediator`] can dispatch (§4.4).
//!
//! Business-command crates (out of core scope, §1) register a
//! `CommandFactory` per `command_type` at startup; the core itself never
//! constructs one.

use std::collections::HashMap;

use oj_core::PlayerId;
use serde_json::Value;
use thiserror::Error;

use crate::mediator::Command;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Validates and projects a container's `config` bag into a typed
/// [`Command`] for one `command_type`.
pub trait CommandFactory: Send + Sync + 'static {
    fn build(&self, player_id: PlayerId, config: &Value) -> Result<Command, FactoryError>;
}

/// `command_type -> CommandFactory`. Recovery (§4.4) looks a row's
/// `command_type` up here; a miss means the row is marked
/// `FAILED(unknown_command_type)` rather than resurrected.
#[derive(Default)]
pub struct CommandFactoryRegistry {
    factories: HashMap<String, Box<dyn CommandFactory>>,
}

impl CommandFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command_type: impl Into<String>, factory: Box<dyn CommandFactory>) {
        self.factories.insert(command_type.into(), factory);
    }

    pub fn contains(&self, command_type: &str) -> bool {
        self.factories.contains_key(command_type)
    }

    /// `None` iff no factory is registered for `command_type` (recovery's
    /// `unknown_command_type` case). `Some(Err(_))` iff the factory rejected
    /// `config` (recovery's `invalid_config` case).
    pub fn build(
        &self,
        command_type: &str,
        player_id: PlayerId,
        config: &Value,
    ) -> Option<Result<Command, FactoryError>> {
        self.factories.get(command_type).map(|factory| factory.build(player_id, config))
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use oj_core::PlayerId;
    use serde_json::Value;

    use super::{Command, CommandFactory, FactoryError};

    /// Test-support factory: always succeeds, wrapping the raw config as the
    /// command payload; counts how many times it was invoked.
    #[derive(Default)]
    pub struct FakeCommandFactory {
        calls: AtomicUsize,
    }

    impl FakeCommandFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl CommandFactory for FakeCommandFactory {
        fn build(&self, _player_id: PlayerId, config: &Value) -> Result<Command, FactoryError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(Command::new(config.clone()))
        }
    }

    /// Test-support factory that always rejects `config`, for exercising the
    /// `invalid_config` recovery path.
    pub struct FailingCommandFactory;

    impl CommandFactory for FailingCommandFactory {
        fn build(&self, _player_id: PlayerId, _config: &Value) -> Result<Command, FactoryError> {
            Err(FactoryError::InvalidConfig("fake factory always rejects".into()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FailingCommandFactory, FakeCommandFactory};

#[cfg(test)]
#[path = "command_factory_tests.rs"]
mod tests;
