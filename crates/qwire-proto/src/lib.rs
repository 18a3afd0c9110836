//! Wire format engine for the q/kdb+ IPC protocol.
//!
//! Everything here is pure byte manipulation with no I/O:
//! - [`ByteBuffer`]: an owned byte block tagged with its endianness
//! - [`MessageHeader`]: the 8-byte frame header, including messages over 4 GiB
//! - [`compress`]/[`decompress`]: the block-based back-reference codec
//! - [`Serializer`] and the `deserialize_*` functions: typed atoms and vectors
//!
//! Protocol features are gated on the negotiated [`ProtocolLevel`].

pub mod buffer;
pub mod codec;
pub mod compress;
pub mod de;
pub mod error;
pub mod header;
pub mod level;
pub mod ser;
pub mod types;

pub use buffer::{ByteBuffer, Endian, Primitive};
pub use codec::{
    check_message_size, decode_frame, decode_payload, encode_frame, EncodedFrame, FrameOptions,
    DEFAULT_COMPRESSION_THRESHOLD,
};
pub use compress::{compress, decompress, decompress_blocks, try_compress};
pub use de::{check_error, deserialize_atom, deserialize_symbol, deserialize_vector, peek_type};
pub use error::{ProtoError, Result};
pub use header::{Compression, MessageHeader, MessageKind, FOUR_GIB, HEADER_SIZE, TWO_GIB};
pub use level::ProtocolLevel;
pub use ser::Serializer;
pub use types::{wire, Guid, Type, WireType};
