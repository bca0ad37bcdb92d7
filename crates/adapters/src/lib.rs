// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-adapters: the external collaborators the container orchestration core
//! depends on but does not implement — dispatching business commands
//! ([`Mediator`]), rehydrating them from persisted config
//! ([`CommandFactoryRegistry`]), and the runner's log sink ([`ContainerLogger`]).

mod command_factory;
mod container_logger;
mod event;
mod mediator;

pub use command_factory::{CommandFactory, CommandFactoryRegistry, FactoryError};
pub use container_logger::{ContainerLog, ContainerLogContext, ContainerLogger};
pub use event::{EventPublisher, WorkerCompletedEvent};
pub use mediator::{Command, CommandResponse, Mediator, MediatorError, NullMediator};

#[cfg(any(test, feature = "test-support"))]
pub use command_factory::{FailingCommandFactory, FakeCommandFactory};
#[cfg(any(test, feature = "test-support"))]
pub use event::FakeEventPublisher;
#[cfg(any(test, feature = "test-support"))]
pub use mediator::{FakeMediator, FakeOutcome};
