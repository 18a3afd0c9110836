use std::io::ErrorKind;

use qwire_proto::{MessageKind, ProtoError, ProtocolLevel};
use qwire_transport::TransportError;

/// Errors that can occur on a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// Transport failure, with what the connection was doing at the time.
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: TransportError,
    },

    /// Invalid data, or a size or type the negotiated level cannot carry.
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// The server closed the stream instead of answering the handshake.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The server speaks an older protocol than was requested.
    #[error("server supports protocol level {supported}, level {requested} was requested")]
    InsufficientLevel {
        requested: ProtocolLevel,
        supported: u8,
    },

    /// A sync request was answered with something other than a response.
    #[error("expected {expected} message, received {found}")]
    UnexpectedMessageKind {
        expected: MessageKind,
        found: MessageKind,
    },

    /// The stream ended before a complete header or payload arrived.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },
}

impl ConnError {
    pub(crate) fn transport(context: &'static str) -> impl FnOnce(TransportError) -> Self {
        move |source| Self::Transport { context, source }
    }

    /// Raw OS error code of an underlying transport failure.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Transport { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// True when a socket timeout fired.
    pub fn is_timeout(&self) -> bool {
        let io = match self {
            Self::Transport {
                source: TransportError::Io(err),
                ..
            }
            | Self::Transport {
                source: TransportError::Connect { source: err, .. },
                ..
            } => err,
            _ => return false,
        };
        matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
    }
}

impl From<TransportError> for ConnError {
    fn from(source: TransportError) -> Self {
        Self::Transport {
            context: "transport",
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnError>;
