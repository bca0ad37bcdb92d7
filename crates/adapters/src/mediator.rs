// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Mediator` indirection the runner dispatches business commands
//! through (§4.2, §6). The core never inspects a command's concrete type —
//! business-command crates register handlers externally and the runner only
//! ever sees a type-erased `Command` in, `CommandResponse` out.

use std::any::Any;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::ContainerLog;

/// An opaque business command produced by a [`crate::command_factory::CommandFactory`].
///
/// Wraps the concrete request type a handler downstream expects; the core
/// only moves it from factory to mediator without ever downcasting it
/// itself.
pub struct Command(Box<dyn Any + Send>);

impl Command {
    pub fn new<T: Send + 'static>(payload: T) -> Self {
        Self(Box::new(payload))
    }

    /// Recover the concrete type a handler registered for. Returns the
    /// command back unchanged on mismatch so a dispatcher can try the next
    /// handler.
    pub fn downcast<T: Send + 'static>(self) -> Result<T, Self> {
        match self.0.downcast::<T>() {
            Ok(payload) => Ok(*payload),
            Err(boxed) => Err(Self(boxed)),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").finish()
    }
}

/// The opaque result of a dispatched [`Command`]. Same erase-and-downcast
/// shape as `Command`; the core never reads the payload.
pub struct CommandResponse(Box<dyn Any + Send>);

impl CommandResponse {
    pub fn new<T: Send + 'static>(payload: T) -> Self {
        Self(Box::new(payload))
    }

    pub fn downcast<T: Send + 'static>(self) -> Result<T, Self> {
        match self.0.downcast::<T>() {
            Ok(payload) => Ok(*payload),
            Err(boxed) => Err(Self(boxed)),
        }
    }
}

impl fmt::Debug for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandResponse").finish()
    }
}

#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("no handler registered for this command")]
    NoHandler,
    #[error("command execution failed: {0}")]
    HandlerFailed(String),
    #[error("cancelled")]
    Cancelled,
}

/// Dispatches a [`Command`] to whichever handler registered for its concrete
/// type. Implementations must propagate `cancel` faithfully — the runner's
/// iteration loop treats a cancelled send as `ContextCancelled`, never a
/// retryable failure (§7).
///
/// `logger` is the container's own log stream, injected by the runner before
/// dispatch — handlers call `logger.log(level, message, metadata)` to write
/// into it directly (§6).
#[async_trait]
pub trait Mediator: Send + Sync + 'static {
    async fn send(
        &self,
        cancel: &CancellationToken,
        command: Command,
        logger: &dyn ContainerLog,
    ) -> Result<CommandResponse, MediatorError>;
}

/// `Mediator` for a process with no business-command crate linked in: every
/// send fails with `NoHandler`. `CommandFactoryRegistry` stays empty in the
/// same process, so recovery already marks those rows `unknown_command_type`
/// before a command ever reaches this mediator — this only covers a
/// freshly-created container racing recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMediator;

#[async_trait]
impl Mediator for NullMediator {
    async fn send(
        &self,
        cancel: &CancellationToken,
        _command: Command,
        _logger: &dyn ContainerLog,
    ) -> Result<CommandResponse, MediatorError> {
        if cancel.is_cancelled() {
            return Err(MediatorError::Cancelled);
        }
        Err(MediatorError::NoHandler)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::{Command, CommandResponse, ContainerLog, Mediator, MediatorError};

    /// Scripted outcome for one `send()` call: `Ok(())` dispatches a unit
    /// response, `Err(msg)` fails with `HandlerFailed(msg)`.
    pub type FakeOutcome = Result<(), String>;

    struct FakeMediatorState {
        outcomes: Vec<FakeOutcome>,
        calls: usize,
    }

    /// Test-support `Mediator` returning a scripted sequence of outcomes,
    /// one per call; the last scripted outcome repeats once exhausted.
    #[derive(Clone)]
    pub struct FakeMediator {
        inner: Arc<Mutex<FakeMediatorState>>,
    }

    impl FakeMediator {
        pub fn new(outcomes: Vec<FakeOutcome>) -> Self {
            Self { inner: Arc::new(Mutex::new(FakeMediatorState { outcomes, calls: 0 })) }
        }

        pub fn always_ok() -> Self {
            Self::new(vec![Ok(())])
        }

        pub fn always_failing(message: impl Into<String>) -> Self {
            Self::new(vec![Err(message.into())])
        }

        pub fn calls(&self) -> usize {
            self.inner.lock().calls
        }
    }

    #[async_trait]
    impl Mediator for FakeMediator {
        async fn send(
            &self,
            cancel: &CancellationToken,
            _command: Command,
            _logger: &dyn ContainerLog,
        ) -> Result<CommandResponse, MediatorError> {
            if cancel.is_cancelled() {
                return Err(MediatorError::Cancelled);
            }
            let mut state = self.inner.lock();
            let idx = state.calls.min(state.outcomes.len().saturating_sub(1));
            state.calls += 1;
            match &state.outcomes[idx] {
                Ok(()) => Ok(CommandResponse::new(())),
                Err(msg) => Err(MediatorError::HandlerFailed(msg.clone())),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMediator, FakeOutcome};

#[cfg(test)]
#[path = "mediator_tests.rs"]
mod tests;
