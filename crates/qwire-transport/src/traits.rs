use bytes::BytesMut;

use crate::error::Result;

/// A connected, blocking byte stream the protocol layer runs over.
///
/// Every call blocks the calling thread. Timeouts, if any, are configured on
/// the concrete transport; the protocol layer never retries.
pub trait Transport {
    /// Send bytes, returning how many were accepted by the OS.
    ///
    /// May accept fewer bytes than offered; callers that need the whole
    /// slice on the wire must loop.
    fn send(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Receive up to `max_bytes`, blocking until at least one byte is
    /// available. An empty buffer means the peer closed the stream.
    fn recv(&mut self, max_bytes: usize) -> Result<BytesMut>;

    /// Like [`Transport::recv`] but leaves the bytes queued.
    fn peek(&mut self, max_bytes: usize) -> Result<BytesMut>;

    /// True for same-host transports (Unix domain sockets). Compression is
    /// skipped on these.
    fn is_local(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).send(bytes)
    }

    fn recv(&mut self, max_bytes: usize) -> Result<BytesMut> {
        (**self).recv(max_bytes)
    }

    fn peek(&mut self, max_bytes: usize) -> Result<BytesMut> {
        (**self).peek(max_bytes)
    }

    fn is_local(&self) -> bool {
        (**self).is_local()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).send(bytes)
    }

    fn recv(&mut self, max_bytes: usize) -> Result<BytesMut> {
        (**self).recv(max_bytes)
    }

    fn peek(&mut self, max_bytes: usize) -> Result<BytesMut> {
        (**self).peek(max_bytes)
    }

    fn is_local(&self) -> bool {
        (**self).is_local()
    }
}
