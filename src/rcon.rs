//! RCON transport adapter.
//!
//! One logical query is one physical connection: connect, authenticate, send
//! a single command, read a single reply, close. No pooling, no retry, no
//! backoff — the scrape interval is the retry mechanism, and a scrape
//! workload is far too low-frequency for connection reuse to matter.
//!
//! Nothing above this module knows about the wire protocol. Failures of any
//! kind (refused connection, bad password, timeout, protocol garbage) are
//! folded into the reply as [`RawReply::is_error`]; the text is then a
//! human-readable description, never data.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

// Packet type codes from the Source RCON protocol, which Minecraft speaks.
// The value 2 doubles as EXECCOMMAND client-side and AUTH_RESPONSE
// server-side.
const TYPE_AUTH: i32 = 3;
const TYPE_EXECCOMMAND: i32 = 2;
const TYPE_AUTH_RESPONSE: i32 = 2;
const TYPE_RESPONSE_VALUE: i32 = 0;

const AUTH_ID: i32 = 1;
const COMMAND_ID: i32 = 2;

// Header past the length field: id + type. Plus two trailing NULs.
const HEADER_LEN: usize = 8;
const PADDING_LEN: usize = 2;

// Servers cap packet bodies around 4 KiB; anything larger is garbage.
const MAX_PACKET_LEN: usize = 8192;

/// One reply from the remote console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    /// Reply text, or an error description when `is_error` is set.
    pub text: String,
    /// Whether the exchange failed. Error text is informational only and
    /// must not be parsed as data.
    pub is_error: bool,
}

impl RawReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Issues a single command against the game server.
///
/// Collectors only see this trait, which lets tests substitute an in-memory
/// fake for the real client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, command: &str) -> RawReply;
}

/// Failure modes of one RCON exchange. Internal: the [`Transport`] boundary
/// converts these into error replies.
#[derive(Debug, Error)]
enum RconError {
    #[error("connection to {address} failed: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("authentication rejected by server")]
    AuthRejected,

    #[error("protocol error: {0}")]
    Protocol(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// RCON client for a single configured server.
///
/// Cheap to share: holds only the address, the shared secret, and the
/// per-exchange deadline.
pub struct RconClient {
    address: String,
    password: String,
    timeout: Duration,
}

impl RconClient {
    pub fn new(address: impl Into<String>, password: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            timeout,
        }
    }

    /// Connect, authenticate, run one command, and return the reply body.
    /// The stream is dropped (closed) on every path out of this function.
    async fn exchange(&self, command: &str) -> Result<String, RconError> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|source| RconError::Connect {
                address: self.address.clone(),
                source,
            })?;

        write_packet(&mut stream, AUTH_ID, TYPE_AUTH, &self.password).await?;

        // Some servers precede the auth response with an empty
        // RESPONSE_VALUE packet; skip those.
        loop {
            let packet = read_packet(&mut stream).await?;
            if packet.kind != TYPE_AUTH_RESPONSE {
                continue;
            }
            if packet.id == -1 {
                return Err(RconError::AuthRejected);
            }
            if packet.id != AUTH_ID {
                return Err(RconError::Protocol("auth response for unknown request id"));
            }
            break;
        }

        write_packet(&mut stream, COMMAND_ID, TYPE_EXECCOMMAND, command).await?;

        let packet = read_packet(&mut stream).await?;
        if packet.kind != TYPE_RESPONSE_VALUE || packet.id != COMMAND_ID {
            return Err(RconError::Protocol("unexpected command response packet"));
        }

        Ok(packet.body)
    }
}

#[async_trait]
impl Transport for RconClient {
    async fn execute(&self, command: &str) -> RawReply {
        match tokio::time::timeout(self.timeout, self.exchange(command)).await {
            Ok(Ok(text)) => RawReply::ok(text),
            Ok(Err(e)) => {
                debug!(command, error = %e, "rcon exchange failed");
                RawReply::error(e.to_string())
            }
            Err(_) => {
                debug!(command, timeout = ?self.timeout, "rcon exchange timed out");
                RawReply::error(format!(
                    "rcon exchange with {} timed out after {:?}",
                    self.address, self.timeout
                ))
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Packet {
    id: i32,
    kind: i32,
    body: String,
}

/// Encode a packet: little-endian length prefix, id, type, body, two NULs.
fn encode_packet(id: i32, kind: i32, body: &str) -> Vec<u8> {
    let len = HEADER_LEN + body.len() + PADDING_LEN;
    let mut buf = Vec::with_capacity(4 + len);
    buf.extend_from_slice(&(len as i32).to_le_bytes());
    buf.extend_from_slice(&id.to_le_bytes());
    buf.extend_from_slice(&kind.to_le_bytes());
    buf.extend_from_slice(body.as_bytes());
    buf.extend_from_slice(&[0, 0]);
    buf
}

async fn write_packet(
    stream: &mut TcpStream,
    id: i32,
    kind: i32,
    body: &str,
) -> Result<(), RconError> {
    stream.write_all(&encode_packet(id, kind, body)).await?;
    Ok(())
}

async fn read_packet(stream: &mut (impl AsyncRead + Unpin)) -> Result<Packet, RconError> {
    let len = stream.read_i32_le().await? as usize;
    if !(HEADER_LEN + PADDING_LEN..=MAX_PACKET_LEN).contains(&len) {
        return Err(RconError::Protocol("packet length out of range"));
    }

    let id = stream.read_i32_le().await?;
    let kind = stream.read_i32_le().await?;

    let mut body = vec![0u8; len - HEADER_LEN - PADDING_LEN];
    stream.read_exact(&mut body).await?;

    let mut padding = [0u8; PADDING_LEN];
    stream.read_exact(&mut padding).await?;

    Ok(Packet {
        id,
        kind,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
