// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket RPC loop (§4.3, §C): accepts one connection per client,
//! reads exactly one [`oj_wire::Request`] frame, dispatches it against a
//! [`DaemonServer`], and writes back one [`oj_wire::Response`] frame.
//! Only the local socket is served — there is no TCP/auth-token surface.

use std::sync::Arc;

use oj_core::{Clock, ContainerId, ContainerStatus, ContainerType, PlayerId, SingletonKey};
use oj_storage::LogRepository;
use oj_wire::{Request, Response};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

use crate::error::{ListenerError, ServerError};
use crate::server::{CreateRequest, DaemonServer};

pub struct Listener<C, LR> {
    unix: UnixListener,
    server: Arc<DaemonServer<C, LR>>,
}

impl<C, LR> Listener<C, LR>
where
    C: Clock + 'static,
    LR: LogRepository + 'static,
{
    pub fn new(unix: UnixListener, server: Arc<DaemonServer<C, LR>>) -> Self {
        Self { unix, server }
    }

    /// Runs the accept loop until `cancel` fires. Each connection is
    /// handled on its own spawned task so one slow client can't stall
    /// others.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                accepted = self.unix.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let server = self.server.clone();
                            let timeout = server_timeout(&server);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, &server, timeout).await {
                                    tracing::debug!(error = %e, "connection closed with error");
                                }
                            });
                        }
                        Err(e) => tracing::error!(error = %e, "unix accept error"),
                    }
                }
            }
        }
    }
}

fn server_timeout<C, LR>(server: &Arc<DaemonServer<C, LR>>) -> std::time::Duration {
    server.tunables().repository_timeout
}

async fn handle_connection<C, LR>(
    mut stream: tokio::net::UnixStream,
    server: &Arc<DaemonServer<C, LR>>,
    timeout: std::time::Duration,
) -> Result<(), ListenerError>
where
    C: Clock + 'static,
    LR: LogRepository + 'static,
{
    let request = oj_wire::read_request(&mut stream).await?;
    let response = match tokio::time::timeout(timeout, dispatch(server, request)).await {
        Ok(response) => response,
        Err(_) => Response::Error { message: "request timed out".to_string() },
    };
    oj_wire::write_response(&mut stream, &response).await?;
    Ok(())
}

async fn dispatch<C, LR>(server: &Arc<DaemonServer<C, LR>>, request: Request) -> Response
where
    C: Clock + 'static,
    LR: LogRepository + 'static,
{
    match request {
        Request::CreateContainer {
            container_type,
            player_id,
            agent_symbol,
            parent_container_id,
            config,
            max_iterations,
            dry_run,
        } => {
            let player_id = match resolve_player(player_id, agent_symbol) {
                Ok(player_id) => player_id,
                Err(e) => return Response::Error { message: e.to_string() },
            };
            let req = CreateRequest {
                player_id,
                singleton_key: singleton_key_for(container_type, player_id, &config),
                command_type: container_type.to_string(),
                container_type,
                parent_container_id: parent_container_id.map(ContainerId::from_string),
                config,
                max_iterations,
                dry_run,
            };
            match server.create_container(req).await {
                Ok(container_id) => {
                    let status =
                        server.get_container(&container_id).map(|c| c.status).unwrap_or(ContainerStatus::Pending);
                    Response::ContainerCreated { container_id: container_id.to_string(), status }
                }
                Err(e) => Response::Error { message: e.to_string() },
            }
        }

        Request::ListContainers { player_id, status } => {
            let containers = server
                .list_containers(player_id.map(PlayerId::new), status)
                .iter()
                .map(oj_wire::ContainerInfo::from)
                .collect();
            Response::Containers { containers }
        }

        Request::GetContainer { id } => {
            let container = server.get_container(&ContainerId::from_string(id));
            Response::Container {
                container: container.as_ref().map(|c| Box::new(oj_wire::ContainerInfo::from(c))),
                metadata: serde_json::Value::Null,
            }
        }

        Request::StopContainer { id } => {
            let id = ContainerId::from_string(id);
            match server.stop_container(&id).await {
                Ok(()) => {
                    let status = server.get_container(&id).map(|c| c.status).unwrap_or(ContainerStatus::Stopped);
                    Response::ContainerStopped { status, message: "stopped".to_string() }
                }
                Err(e) => Response::Error { message: e.to_string() },
            }
        }

        Request::GetContainerLogs { id, limit, level } => {
            let entries = server
                .container_logs(&ContainerId::from_string(id), limit.unwrap_or(100), level)
                .iter()
                .map(oj_wire::LogEntryWire::from)
                .collect();
            Response::ContainerLogs { entries }
        }

        Request::HealthCheck => Response::Health {
            status: "ok".to_string(),
            version: crate::config::PROTOCOL_VERSION.to_string(),
            active_container_count: server.active_container_count(),
            uptime_secs: server.uptime().as_secs(),
        },
    }
}

/// `agent_symbol` resolution requires looking up the tenant's live agent
/// roster through the game API, which this process has no adapter for yet
/// — so a bare `agent_symbol` with no `player_id` always fails resolution
/// rather than silently defaulting to an arbitrary id.
fn resolve_player(player_id: Option<i64>, agent_symbol: Option<String>) -> Result<PlayerId, ServerError> {
    match player_id {
        Some(id) if id != 0 => Ok(PlayerId::new(id)),
        _ => Err(ServerError::UnresolvedPlayer(agent_symbol.unwrap_or_else(|| "<missing>".to_string()))),
    }
}

/// Mirrors the (player_id, container_type)-scoped key a container occupies
/// for the types enforcing a singleton per §4.3's table.
fn singleton_key_for(container_type: ContainerType, player_id: PlayerId, config: &serde_json::Value) -> Option<SingletonKey> {
    match container_type {
        ContainerType::ManufacturingCoordinator => config
            .get("system_symbol")
            .and_then(|v| v.as_str())
            .map(|system_symbol| SingletonKey::ManufacturingCoordinator { player_id, system_symbol: system_symbol.to_string() }),
        ContainerType::GasCoordinator => config
            .get("gas_giant")
            .and_then(|v| v.as_str())
            .map(|gas_giant| SingletonKey::GasCoordinator { player_id, gas_giant: gas_giant.to_string() }),
        ContainerType::ContractWorkflow => Some(SingletonKey::ContractWorkflow { player_id }),
        _ => None,
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
