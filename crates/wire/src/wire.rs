// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed JSON framing over an async byte stream.
//!
//! Each message is a 4-byte big-endian length prefix followed by that many
//! bytes of JSON payload. No compression, no versioning byte — the daemon and
//! its clients are always built from the same workspace.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Request, Response};

/// Largest message this transport will read or write. Guards against a
/// corrupt or malicious length prefix causing an unbounded allocation.
const MAX_MESSAGE_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message of {len} bytes exceeds the {MAX_MESSAGE_BYTES}-byte limit")]
    MessageTooLarge { len: u32 },
}

/// Serialize `value` to JSON. No length prefix; callers that need framing
/// use [`write_message`] instead.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a JSON payload (no length prefix) into `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `payload` as one length-prefixed frame.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::MessageTooLarge {
        len: u32::MAX,
    })?;
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge { len });
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame, returning its raw payload bytes.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge { len });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Read one frame and decode it as a [`Request`].
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let payload = read_message(reader).await?;
    decode(&payload)
}

/// Encode `response` and write it as one frame.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), ProtocolError> {
    let payload = encode(response)?;
    write_message(writer, &payload).await
}

/// Encode `request` and write it as one frame — the client-side mirror of
/// [`write_response`].
pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
) -> Result<(), ProtocolError> {
    let payload = encode(request)?;
    write_message(writer, &payload).await
}

/// Read one frame and decode it as a [`Response`] — the client-side mirror
/// of [`read_request`].
pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Response, ProtocolError> {
    let payload = read_message(reader).await?;
    decode(&payload)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
