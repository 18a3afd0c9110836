use crate::level::ProtocolLevel;
use crate::types::Type;

/// Errors raised while building or parsing wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// Protocol level outside 0..=6, or the reserved level 4.
    #[error("invalid protocol level {0} (expected 0-3, 5 or 6)")]
    InvalidLevel(u8),

    /// Header byte 1 is not async, sync or response.
    #[error("invalid message kind {0}")]
    InvalidMessageKind(u8),

    /// Header byte 2 is not 0, 1 or 2.
    #[error("invalid compression marker {0}")]
    InvalidCompressionMarker(u8),

    /// Declared frame length is shorter than the frame header.
    #[error("invalid frame length {0}")]
    InvalidLength(u64),

    /// Message exceeds what the negotiated level can carry.
    #[error("message of {size} bytes too large for protocol level {level}")]
    MessageTooLarge { size: u64, level: ProtocolLevel },

    /// Vector count exceeds what the negotiated level can carry.
    #[error("vector of {len} elements too large for protocol level {level}")]
    ArrayTooLarge { len: usize, level: ProtocolLevel },

    /// Wire type not available at the negotiated level.
    #[error("protocol level {level} does not support {ty}")]
    UnsupportedType { ty: Type, level: ProtocolLevel },

    /// Compressed block stream is inconsistent with its declared size.
    #[error("corrupt compressed payload: {0}")]
    CorruptCompressedPayload(&'static str),

    /// Buffer allocation failed.
    #[error("failed to allocate {size} bytes")]
    Allocation { size: u64 },

    /// Buffer is shorter than its contents declare.
    #[error("truncated payload (needed {needed} bytes, have {available})")]
    Truncated { needed: usize, available: usize },

    /// Payload holds a different type than requested.
    #[error("unexpected type {found} (expected {expected})")]
    UnexpectedType { expected: i8, found: i8 },

    /// The server answered with an error object.
    #[error("remote error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
