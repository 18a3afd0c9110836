/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Host name resolution failed or produced no addresses.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS was requested but is not available.
    #[error("TLS transport is not supported")]
    TlsUnsupported,

    /// The peer closed the stream.
    #[error("transport closed by peer")]
    Closed,
}

impl TransportError {
    /// Raw OS error code of the underlying failure, if there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Resolve { source, .. } | Self::Connect { source, .. } | Self::Io(source) => {
                source.raw_os_error()
            }
            Self::TlsUnsupported | Self::Closed => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
