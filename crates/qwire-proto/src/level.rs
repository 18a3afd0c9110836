use std::fmt;

use serde::Serialize;

use crate::error::{ProtoError, Result};
use crate::types::Type;

/// Capability level negotiated during the handshake.
///
/// | level | adds |
/// |-------|------|
/// | 0     | base protocol |
/// | 1, 2  | compression, timestamp, timespan |
/// | 3     | GUID |
/// | 4     | reserved, never valid |
/// | 5     | messages over 2 GiB (vectors still capped at 2 billion elements) |
/// | 6     | vectors over 2 billion elements |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProtocolLevel(u8);

impl ProtocolLevel {
    /// Highest level this crate speaks.
    pub const LATEST: ProtocolLevel = ProtocolLevel(6);

    /// Validate a raw level byte.
    pub fn new(level: u8) -> Result<Self> {
        match level {
            0..=3 | 5 | 6 => Ok(Self(level)),
            other => Err(ProtoError::InvalidLevel(other)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn supports_compression(self) -> bool {
        self.0 >= 1
    }

    /// Timestamp and timespan types.
    pub fn supports_temporal(self) -> bool {
        self.0 >= 1
    }

    pub fn supports_guid(self) -> bool {
        self.0 >= 3
    }

    /// Messages of 2 GiB and above.
    pub fn supports_large_messages(self) -> bool {
        self.0 >= 5
    }

    /// Vectors of more than 2 billion elements.
    pub fn supports_large_arrays(self) -> bool {
        self.0 >= 6
    }

    /// Whether values of `ty` may be sent at this level.
    pub fn supports_type(self, ty: Type) -> bool {
        match ty {
            Type::Guid => self.supports_guid(),
            Type::Timestamp | Type::Timespan => self.supports_temporal(),
            _ => true,
        }
    }
}

impl Default for ProtocolLevel {
    fn default() -> Self {
        Self::LATEST
    }
}

impl TryFrom<u8> for ProtocolLevel {
    type Error = ProtoError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl From<ProtocolLevel> for u8 {
    fn from(level: ProtocolLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for ProtocolLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
