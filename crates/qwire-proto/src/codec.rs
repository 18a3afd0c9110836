//! Frame assembly: header, optional original-size field, payload.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::buffer::{ByteBuffer, Endian};
use crate::compress::{decompress, try_compress};
use crate::error::{ProtoError, Result};
use crate::header::{Compression, MessageHeader, MessageKind, HEADER_SIZE, TWO_GIB};
use crate::level::ProtocolLevel;

/// Uncompressed frames at or below this many bytes are never compressed.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 2000;

/// Per-frame encoding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    /// Negotiated protocol level.
    pub level: ProtocolLevel,
    /// Whether compression may be attempted at all. Connections turn this
    /// off for local transports.
    pub compression: bool,
    /// Uncompressed frame size (header included) that must be exceeded
    /// before compression is attempted.
    pub compression_threshold: usize,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            level: ProtocolLevel::LATEST,
            compression: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

impl FrameOptions {
    pub fn new(level: ProtocolLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }
}

/// A frame ready for the wire, kept as two parts so they can be written
/// with separate sends.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// 8-byte header, followed by the 4- or 8-byte original-size field when
    /// the payload is compressed.
    pub header: BytesMut,
    pub payload: ByteBuffer,
    pub kind: MessageKind,
    pub compression: Compression,
    /// Total frame length had the payload been sent uncompressed.
    pub uncompressed_len: u64,
}

impl EncodedFrame {
    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    /// Header and payload as one contiguous block.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.wire_size());
        out.put_slice(&self.header);
        out.put_slice(self.payload.as_slice());
        out.freeze()
    }
}

/// Fail if a frame of `total` bytes cannot be carried at `level`.
pub fn check_message_size(total: u64, level: ProtocolLevel) -> Result<()> {
    if total >= TWO_GIB && !level.supports_large_messages() {
        return Err(ProtoError::MessageTooLarge { size: total, level });
    }
    Ok(())
}

/// Build a frame around `payload`, compressing it when `options` allow and
/// compression actually shrinks it.
///
/// The frame's byte order is the payload's.
pub fn encode_frame(
    payload: ByteBuffer,
    kind: MessageKind,
    options: &FrameOptions,
) -> Result<EncodedFrame> {
    let endian = payload.endian();
    let uncompressed_len = (HEADER_SIZE + payload.len()) as u64;
    check_message_size(uncompressed_len, options.level)?;

    let attempt = options.compression
        && options.level.supports_compression()
        && uncompressed_len > options.compression_threshold as u64;

    if attempt {
        match try_compress(payload.as_slice()) {
            Some(blocks) => {
                let compression = Compression::for_uncompressed_total(uncompressed_len);
                let header_len = HEADER_SIZE + compression.size_field_width();
                let header = MessageHeader {
                    endian,
                    kind,
                    compression,
                    total_len: (header_len + blocks.len()) as u64,
                };

                let mut buf = BytesMut::with_capacity(header_len);
                buf.put_slice(&header.encode()?);
                put_size_field(&mut buf, compression, endian, uncompressed_len);

                debug!(
                    kind = %kind,
                    uncompressed = uncompressed_len,
                    compressed = header.total_len,
                    "compressed frame"
                );
                return Ok(EncodedFrame {
                    header: buf,
                    payload: ByteBuffer::from_vec(blocks, endian),
                    kind,
                    compression,
                    uncompressed_len,
                });
            }
            None => {
                debug!(size = uncompressed_len, "compression did not pay off, sending raw");
            }
        }
    }

    let header = MessageHeader {
        endian,
        kind,
        compression: Compression::None,
        total_len: uncompressed_len,
    };
    let mut buf = BytesMut::with_capacity(HEADER_SIZE);
    buf.put_slice(&header.encode()?);

    Ok(EncodedFrame {
        header: buf,
        payload,
        kind,
        compression: Compression::None,
        uncompressed_len,
    })
}

fn put_size_field(dst: &mut BytesMut, compression: Compression, endian: Endian, size: u64) {
    match (compression, endian) {
        (Compression::None, _) => {}
        (Compression::Compressed32, Endian::Little) => dst.put_u32_le(size as u32),
        (Compression::Compressed32, Endian::Big) => dst.put_u32(size as u32),
        (Compression::Compressed64, Endian::Little) => dst.put_u64_le(size),
        (Compression::Compressed64, Endian::Big) => dst.put_u64(size),
    }
}

/// Turn the bytes that followed `header` on the wire into the logical
/// payload: tag it with the frame's byte order and decompress if flagged.
pub fn decode_payload(header: &MessageHeader, mut payload: ByteBuffer) -> Result<ByteBuffer> {
    payload.set_endian(header.endian);
    if !header.compression.is_compressed() {
        return Ok(payload);
    }

    let out = decompress(&payload, header.compression)?;
    debug!(
        compressed = header.total_len,
        uncompressed = HEADER_SIZE + out.len(),
        "decompressed frame"
    );
    Ok(out)
}

/// Decode one complete frame held in memory.
pub fn decode_frame(bytes: &[u8]) -> Result<(MessageHeader, ByteBuffer)> {
    let raw = bytes
        .get(..HEADER_SIZE)
        .and_then(|head| <&[u8; HEADER_SIZE]>::try_from(head).ok())
        .ok_or(ProtoError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        })?;
    let header = MessageHeader::decode(raw)?;

    let total = usize::try_from(header.total_len).map_err(|_| ProtoError::Allocation {
        size: header.total_len,
    })?;
    let body = bytes.get(HEADER_SIZE..total).ok_or(ProtoError::Truncated {
        needed: total,
        available: bytes.len(),
    })?;

    let payload = decode_payload(&header, ByteBuffer::from_slice(body, header.endian))?;
    Ok((header, payload))
}
