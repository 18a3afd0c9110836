use qwire_proto::{ByteBuffer, Endian};
use qwire_transport::{Transport, TransportError};

use crate::error::{ConnError, Result};

/// Largest single `recv` request.
const RECV_CHUNK: usize = 64 * 1024;

/// Write all of `bytes`, looping over partial sends.
pub(crate) fn send_all<T: Transport>(
    transport: &mut T,
    bytes: &[u8],
    context: &'static str,
) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        let sent = transport
            .send(&bytes[offset..])
            .map_err(ConnError::transport(context))?;
        if sent == 0 {
            return Err(ConnError::transport(context)(TransportError::Closed));
        }
        offset += sent;
    }
    Ok(())
}

/// Read exactly `len` bytes. End of stream before that is a
/// [`ConnError::ShortRead`].
pub(crate) fn recv_exact<T: Transport>(
    transport: &mut T,
    len: usize,
    endian: Endian,
    context: &'static str,
) -> Result<ByteBuffer> {
    let mut buf = ByteBuffer::try_zeroed(len, endian)?;
    let mut filled = 0usize;
    while filled < len {
        let want = (len - filled).min(RECV_CHUNK);
        let chunk = transport.recv(want).map_err(ConnError::transport(context))?;
        if chunk.is_empty() {
            return Err(ConnError::ShortRead {
                expected: len,
                received: filled,
            });
        }
        // Transports may ignore the cap; never write past the buffer.
        let take = chunk.len().min(len - filled);
        buf.as_mut_slice()[filled..filled + take].copy_from_slice(&chunk[..take]);
        filled += take;
    }
    Ok(buf)
}
