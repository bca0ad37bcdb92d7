// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj`: thin CLI client for `ojd`, talking to it over the same Unix-socket
//! RPC surface `ojd` itself accepts — every subcommand here is a single
//! [`oj_wire::Request`]/[`oj_wire::Response`] round trip.

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oj_core::{ContainerStatus, ContainerType, LogLevel};
use oj_daemon::config::Config;
use oj_wire::{Request, Response};
use serde::de::DeserializeOwned;

use client::{ok_or_error, DaemonClient};

#[derive(Parser)]
#[command(name = "oj", about = "Client for the container-orchestration daemon")]
struct Cli {
    /// Override the daemon's Unix socket path (defaults to the resolved state dir).
    #[arg(long, global = true)]
    socket: Option<std::path::PathBuf>,

    /// Print raw JSON instead of a formatted summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new container.
    Create {
        /// Container type, e.g. `navigate`, `mining_worker`, `manufacturing_coordinator`.
        container_type: String,
        #[arg(long)]
        player_id: Option<i64>,
        #[arg(long)]
        agent_symbol: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        /// Inline JSON config, e.g. `'{"system_symbol":"X1-AB"}'`.
        #[arg(long, default_value = "null")]
        config: String,
        #[arg(long, default_value_t = 1)]
        max_iterations: i64,
        /// Bypass the singleton check (only honored for `gas_coordinator`).
        #[arg(long)]
        dry_run: bool,
    },
    /// List containers, optionally filtered.
    List {
        #[arg(long)]
        player_id: Option<i64>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Get one container's current state.
    Get { id: String },
    /// Request a container stop.
    Stop { id: String },
    /// Tail a container's persisted logs.
    Logs {
        id: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        level: Option<String>,
    },
    /// Check daemon liveness and uptime.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket_path = match &cli.socket {
        Some(path) => path.clone(),
        None => Config::load().context("could not resolve the daemon's socket path")?.socket_path,
    };

    let request = build_request(cli.command)?;
    let client = DaemonClient::connect(&socket_path).await?;
    let response = ok_or_error(client.call(request).await?)?;
    print_response(response, cli.json)
}

fn build_request(command: Command) -> Result<Request> {
    Ok(match command {
        Command::Create { container_type, player_id, agent_symbol, parent, config, max_iterations, dry_run } => {
            Request::CreateContainer {
                container_type: parse_enum::<ContainerType>(&container_type)?,
                player_id,
                agent_symbol,
                parent_container_id: parent,
                config: serde_json::from_str(&config).context("--config must be valid JSON")?,
                max_iterations,
                dry_run,
            }
        }
        Command::List { player_id, status } => Request::ListContainers {
            player_id,
            status: status.map(|s| parse_enum::<ContainerStatus>(&s)).transpose()?,
        },
        Command::Get { id } => Request::GetContainer { id },
        Command::Stop { id } => Request::StopContainer { id },
        Command::Logs { id, limit, level } => {
            Request::GetContainerLogs { id, limit, level: level.map(|s| parse_enum::<LogLevel>(&s)).transpose()? }
        }
        Command::Health => Request::HealthCheck,
    })
}

fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .with_context(|| format!("{s:?} is not a recognized value"))
}

fn print_response(response: Response, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response {
        Response::ContainerCreated { container_id, status } => {
            println!("{container_id} ({status})");
        }
        Response::Containers { containers } => {
            if containers.is_empty() {
                println!("no containers");
            }
            for c in containers {
                println!("{} {} {} iter={}/{}", c.id, c.container_type, c.status, c.current_iteration, c.max_iterations);
            }
        }
        Response::Container { container: Some(c), .. } => {
            println!("{} {} {} iter={}/{}", c.id, c.container_type, c.status, c.current_iteration, c.max_iterations);
            if let Some(reason) = &c.exit_reason {
                println!("exit_reason: {reason}");
            }
        }
        Response::Container { container: None, .. } => println!("no such container"),
        Response::ContainerStopped { status, message } => println!("{status}: {message}"),
        Response::ContainerLogs { entries } => {
            for e in entries {
                println!("[{}] {} {}", e.timestamp_ms, e.level, e.message);
            }
        }
        Response::Health { status, version, active_container_count, uptime_secs } => {
            println!("status={status} version={version} active={active_container_count} uptime_secs={uptime_secs}");
        }
        Response::Ok => println!("ok"),
        Response::Hello { version } => println!("ojd {version}"),
        Response::Error { message } => println!("error: {message}"),
    }
    Ok(())
}
