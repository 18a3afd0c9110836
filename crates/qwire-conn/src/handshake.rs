use std::fmt;
use std::time::Duration;

use qwire_proto::ProtocolLevel;
use qwire_transport::Transport;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ConnError, Result};
use crate::io::send_all;

/// Default socket timeout applied while connecting and afterwards.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for handshake negotiation.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// `user:password`, sent as-is. Redacted in debug output.
    pub credentials: Option<String>,
    /// Level to request. The server must support at least this level.
    pub level: ProtocolLevel,
    /// Socket read and write timeout. `None` blocks indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            level: ProtocolLevel::LATEST,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl HandshakeConfig {
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    pub fn with_level(mut self, level: ProtocolLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("HandshakeConfig");
        if let Some(credentials) = &self.credentials {
            dbg.field(
                "credentials",
                &format_args!("<redacted:{} bytes>", credentials.len()),
            );
        } else {
            dbg.field("credentials", &Option::<String>::None);
        }
        dbg.field("level", &self.level)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Lifecycle of a connection attempt. `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unconnected,
    HandshakeSent,
    Ready,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconnected => "unconnected",
            Self::HandshakeSent => "handshake_sent",
            Self::Ready => "ready",
            Self::Failed => "failed",
        })
    }
}

/// Perform the client side of the handshake on a freshly connected
/// transport and return the negotiated level.
///
/// Sends the credentials followed by `[level, 0]`, then waits for the one
/// byte answer. Closing the stream instead of answering means the
/// credentials were rejected.
pub fn handshake<T: Transport>(transport: &mut T, config: &HandshakeConfig) -> Result<ProtocolLevel> {
    let requested = config.level;
    debug!(state = %ConnectionState::Unconnected, %requested, "starting handshake");

    let result = exchange(transport, config);
    match &result {
        Ok(level) => info!(state = %ConnectionState::Ready, %level, "handshake complete"),
        Err(err) => debug!(state = %ConnectionState::Failed, error = %err, "handshake failed"),
    }
    result
}

fn exchange<T: Transport>(transport: &mut T, config: &HandshakeConfig) -> Result<ProtocolLevel> {
    let requested = config.level;

    if let Some(credentials) = config.credentials.as_deref() {
        send_all(transport, credentials.as_bytes(), "sending credentials")?;
    }
    send_all(transport, &[requested.get(), 0], "sending capability")?;
    debug!(state = %ConnectionState::HandshakeSent, "capability sent");

    let reply = transport
        .recv(1)
        .map_err(ConnError::transport("reading handshake reply"))?;
    let Some(&supported) = reply.first() else {
        return Err(ConnError::AuthenticationFailed);
    };

    if supported < requested.get() {
        return Err(ConnError::InsufficientLevel {
            requested,
            supported,
        });
    }
    Ok(requested)
}
