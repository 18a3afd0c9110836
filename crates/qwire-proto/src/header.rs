use std::fmt;

use serde::Serialize;

use crate::buffer::{ByteBuffer, Endian};
use crate::error::{ProtoError, Result};

/// Every frame starts with this many header bytes.
pub const HEADER_SIZE: usize = 8;

pub const TWO_GIB: u64 = 1 << 31;
pub const FOUR_GIB: u64 = 1 << 32;

/// Largest frame the length fields can describe: 255 × 4 GiB + (4 GiB - 1).
pub const MAX_FRAME_LEN: u64 = 256 * FOUR_GIB - 1;

/// Header byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MessageKind {
    Async = 0,
    Sync = 1,
    Response = 2,
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtoError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Async),
            1 => Ok(Self::Sync),
            2 => Ok(Self::Response),
            other => Err(ProtoError::InvalidMessageKind(other)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Async => "async",
            Self::Sync => "sync",
            Self::Response => "response",
        })
    }
}

/// Header byte 2: whether the payload is compressed and how wide the
/// original-size field that follows the header is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Compression {
    None = 0,
    /// Original size stored in 4 bytes.
    Compressed32 = 1,
    /// Original size stored in 8 bytes.
    Compressed64 = 2,
}

impl Compression {
    /// Marker for a compressed message whose uncompressed total is `total`.
    pub fn for_uncompressed_total(total: u64) -> Self {
        if total < FOUR_GIB {
            Self::Compressed32
        } else {
            Self::Compressed64
        }
    }

    /// Width of the original-size field after the header.
    pub fn size_field_width(self) -> usize {
        match self {
            Self::None => 0,
            Self::Compressed32 => 4,
            Self::Compressed64 => 8,
        }
    }

    pub fn is_compressed(self) -> bool {
        self != Self::None
    }
}

impl TryFrom<u8> for Compression {
    type Error = ProtoError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::None),
            1 => Ok(Self::Compressed32),
            2 => Ok(Self::Compressed64),
            other => Err(ProtoError::InvalidCompressionMarker(other)),
        }
    }
}

/// The fixed 8-byte frame header.
///
/// ```text
/// ┌────────┬──────┬─────────────┬──────────┬───────────────────────┐
/// │ byte 0 │ 1    │ 2           │ 3        │ 4..8                  │
/// │ endian │ kind │ compression │ len/4GiB │ len mod 4GiB (u32)    │
/// └────────┴──────┴─────────────┴──────────┴───────────────────────┘
/// ```
///
/// `total_len` covers the whole frame, header included. The residual is
/// stored in the frame's own byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    pub endian: Endian,
    pub kind: MessageKind,
    pub compression: Compression,
    pub total_len: u64,
}

impl MessageHeader {
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        if self.total_len < HEADER_SIZE as u64 || self.total_len > MAX_FRAME_LEN {
            return Err(ProtoError::InvalidLength(self.total_len));
        }

        let mut buf = ByteBuffer::zeroed(HEADER_SIZE, self.endian);
        buf.write_at(0, self.endian.flag());
        buf.write_at(1, self.kind as u8);
        buf.write_at(2, self.compression as u8);
        buf.write_at(3, (self.total_len / FOUR_GIB) as u8);
        buf.write_at(4, (self.total_len % FOUR_GIB) as u32);

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(buf.as_slice());
        Ok(out)
    }

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let endian = Endian::from_flag(bytes[0]);
        let kind = MessageKind::try_from(bytes[1])?;
        let compression = Compression::try_from(bytes[2])?;

        let buf = ByteBuffer::from_slice(bytes, endian);
        let total_len = FOUR_GIB * u64::from(buf.read_at::<u8>(3)) + u64::from(buf.read_at::<u32>(4));
        if total_len < HEADER_SIZE as u64 {
            return Err(ProtoError::InvalidLength(total_len));
        }

        Ok(Self {
            endian,
            kind,
            compression,
            total_len,
        })
    }

    /// Bytes following the 8-byte header.
    pub fn payload_len(&self) -> u64 {
        self.total_len - HEADER_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_sync_header_bytes() {
        let header = MessageHeader {
            endian: Endian::Little,
            kind: MessageKind::Sync,
            compression: Compression::None,
            total_len: 13,
        };
        assert_eq!(header.encode().unwrap(), [1, 1, 0, 0, 13, 0, 0, 0]);
    }

    #[test]
    fn big_endian_header_bytes() {
        let header = MessageHeader {
            endian: Endian::Big,
            kind: MessageKind::Response,
            compression: Compression::Compressed32,
            total_len: 0x0102,
        };
        assert_eq!(header.encode().unwrap(), [0, 2, 1, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn length_over_four_gib_uses_multiplier_byte() {
        let total_len = 3 * FOUR_GIB + 17;
        let header = MessageHeader {
            endian: Endian::Little,
            kind: MessageKind::Async,
            compression: Compression::Compressed64,
            total_len,
        };
        let bytes = header.encode().unwrap();
        assert_eq!(bytes[3], 3);
        assert_eq!(&bytes[4..], &[17, 0, 0, 0]);
        assert_eq!(MessageHeader::decode(&bytes).unwrap().total_len, total_len);
    }

    #[test]
    fn decode_recovers_fields() {
        for endian in [Endian::Little, Endian::Big] {
            for kind in [MessageKind::Async, MessageKind::Sync, MessageKind::Response] {
                for compression in [
                    Compression::None,
                    Compression::Compressed32,
                    Compression::Compressed64,
                ] {
                    let header = MessageHeader {
                        endian,
                        kind,
                        compression,
                        total_len: 2 * FOUR_GIB + 0xDEAD_BEEF,
                    };
                    let decoded = MessageHeader::decode(&header.encode().unwrap()).unwrap();
                    assert_eq!(decoded, header);
                    assert_eq!(decoded.payload_len(), header.total_len - 8);
                }
            }
        }
    }

    #[test]
    fn invalid_kind_and_marker_rejected() {
        assert!(matches!(
            MessageHeader::decode(&[1, 3, 0, 0, 8, 0, 0, 0]),
            Err(ProtoError::InvalidMessageKind(3))
        ));
        assert!(matches!(
            MessageHeader::decode(&[1, 0, 9, 0, 8, 0, 0, 0]),
            Err(ProtoError::InvalidCompressionMarker(9))
        ));
    }

    #[test]
    fn length_shorter_than_header_rejected() {
        assert!(matches!(
            MessageHeader::decode(&[1, 0, 0, 0, 4, 0, 0, 0]),
            Err(ProtoError::InvalidLength(4))
        ));
    }

    #[test]
    fn compression_marker_choice() {
        assert_eq!(
            Compression::for_uncompressed_total(FOUR_GIB - 1),
            Compression::Compressed32
        );
        assert_eq!(
            Compression::for_uncompressed_total(FOUR_GIB),
            Compression::Compressed64
        );
        assert_eq!(Compression::Compressed64.size_field_width(), 8);
        assert_eq!(Compression::None.size_field_width(), 0);
    }
}
