use std::fmt;
use std::io;

use qwire_conn::ConnError;
use qwire_proto::ProtoError;
use qwire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Local file errors.
pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: &TransportError) -> CliError {
    let code = match err {
        TransportError::Connect { source, .. } | TransportError::Io(source)
            if matches!(
                source.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) =>
        {
            TIMEOUT
        }
        TransportError::TlsUnsupported => USAGE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn proto_error(context: &str, err: &ProtoError) -> CliError {
    let code = match err {
        ProtoError::InvalidLevel(_) => USAGE,
        ProtoError::Allocation { .. } => INTERNAL,
        ProtoError::Remote(_) => FAILURE,
        _ => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn conn_error(context: &str, err: ConnError) -> CliError {
    match &err {
        ConnError::Transport { source, .. } => {
            let mut mapped = transport_error(context, source);
            mapped.message = format!("{context}: {err}");
            mapped
        }
        ConnError::Proto(inner) => proto_error(context, inner),
        ConnError::AuthenticationFailed | ConnError::InsufficientLevel { .. } => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        ConnError::ShortRead { .. } => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ConnError::UnexpectedMessageKind { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_map_to_exit_codes() {
        assert_eq!(
            conn_error("connect", ConnError::AuthenticationFailed).code,
            PERMISSION_DENIED
        );
        assert_eq!(
            conn_error(
                "receive",
                ConnError::ShortRead {
                    expected: 8,
                    received: 0
                }
            )
            .code,
            TRANSPORT_ERROR
        );
        assert_eq!(
            conn_error("send", ConnError::Proto(ProtoError::InvalidMessageKind(7))).code,
            DATA_INVALID
        );
    }

    #[test]
    fn socket_timeouts_map_to_124() {
        let err = ConnError::Transport {
            context: "reading frame header",
            source: TransportError::Io(io::Error::new(io::ErrorKind::WouldBlock, "timed out")),
        };
        let mapped = conn_error("receive", err);
        assert_eq!(mapped.code, TIMEOUT);
        assert!(mapped.message.contains("reading frame header"));
    }

    #[test]
    fn refused_connection_is_transport_error() {
        let err = TransportError::Connect {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(transport_error("connect", &err).code, TRANSPORT_ERROR);
    }
}
