// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin Unix-socket client: connects to `ojd`, sends one [`oj_wire::Request`]
//! frame, and reads back the matching [`oj_wire::Response`].

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use oj_wire::{Request, Response};
use tokio::net::UnixStream;

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)
            .await
            .with_context(|| format!("daemon not reachable at {}", socket_path.display()))?;
        Ok(Self { stream })
    }

    pub async fn call(mut self, request: Request) -> Result<Response> {
        oj_wire::write_request(&mut self.stream, &request).await.context("failed to send request")?;
        oj_wire::read_response(&mut self.stream).await.context("failed to read response")
    }
}

/// Turns an `Error` response into an `Err`, leaving every other variant as-is.
pub fn ok_or_error(response: Response) -> Result<Response> {
    match response {
        Response::Error { message } => Err(anyhow!("{message}")),
        other => Ok(other),
    }
}
