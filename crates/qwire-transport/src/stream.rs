use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use bytes::BytesMut;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::local::{is_local_address, local_addresses, resolve, unix_socket_path};
use crate::traits::Transport;

/// A connected blocking stream to a server: TCP or a Unix domain socket.
pub struct KxStream {
    inner: KxStreamInner,
}

enum KxStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl KxStream {
    /// Connect to `host:port`.
    ///
    /// Same-host servers are reached over the Unix domain socket
    /// `/tmp/kx.<port>` when it exists, falling back to TCP otherwise.
    /// A zero or absent `timeout` means block indefinitely.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        use_tls: bool,
    ) -> Result<Self> {
        if use_tls {
            return Err(TransportError::TlsUnsupported);
        }

        let addrs = resolve(host, port)?;

        #[cfg(unix)]
        if addrs
            .iter()
            .any(|addr| is_local_address(addr.ip(), local_addresses()))
        {
            let path = unix_socket_path(port);
            match Self::connect_unix(&path, timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    debug!(?path, error = %err, "unix domain socket unavailable, using tcp");
                }
            }
        }

        Self::connect_addrs(&addrs, timeout)
    }

    /// Connect over TCP, trying each resolved address in turn.
    pub fn connect_tcp(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<Self> {
        let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
        Self::connect_addrs(&addrs, timeout)
    }

    /// Connect to a Unix domain socket at `path`.
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<Path>, timeout: Option<Duration>) -> Result<Self> {
        let path = path.as_ref();
        let stream = std::os::unix::net::UnixStream::connect(path).map_err(|source| {
            TransportError::Connect {
                addr: path.display().to_string(),
                source,
            }
        })?;
        let stream = Self::from_unix(stream);
        stream.set_timeouts(timeout)?;
        debug!(?path, "connected to unix domain socket");
        Ok(stream)
    }

    fn connect_addrs(addrs: &[SocketAddr], timeout: Option<Duration>) -> Result<Self> {
        let timeout = timeout.filter(|t| !t.is_zero());
        let mut last_err = None;

        for addr in addrs {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(addr, t),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    #[cfg(unix)]
                    set_keepalive(&stream)?;
                    let stream = Self::from_tcp(stream);
                    stream.set_timeouts(timeout)?;
                    debug!(%addr, "connected over tcp");
                    return Ok(stream);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "tcp connect attempt failed");
                    last_err = Some((*addr, err));
                }
            }
        }

        Err(match last_err {
            Some((addr, source)) => TransportError::Connect {
                addr: addr.to_string(),
                source,
            },
            None => TransportError::Connect {
                addr: "<none>".to_string(),
                source: std::io::Error::new(ErrorKind::NotFound, "no addresses to connect to"),
            },
        })
    }

    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: KxStreamInner::Tcp(stream),
        }
    }

    /// Wrap an already connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: KxStreamInner::Unix(stream),
        }
    }

    fn set_timeouts(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.filter(|t| !t.is_zero());
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            KxStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            KxStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            KxStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            KxStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            KxStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(unix)]
            KxStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            KxStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            KxStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl Read for KxStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            KxStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            KxStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for KxStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            KxStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            KxStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            KxStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            KxStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl Transport for KxStream {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        loop {
            match self.write(bytes) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn recv(&mut self, max_bytes: usize) -> Result<BytesMut> {
        let mut buf = BytesMut::zeroed(max_bytes);
        if max_bytes == 0 {
            return Ok(buf);
        }
        let read = loop {
            match self.read(&mut buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        };
        buf.truncate(read);
        Ok(buf)
    }

    fn peek(&mut self, max_bytes: usize) -> Result<BytesMut> {
        let mut buf = BytesMut::zeroed(max_bytes);
        if max_bytes == 0 {
            return Ok(buf);
        }
        let read = loop {
            let attempt = match &self.inner {
                KxStreamInner::Tcp(stream) => stream.peek(&mut buf),
                #[cfg(unix)]
                KxStreamInner::Unix(stream) => peek_unix(stream, &mut buf),
            };
            match attempt {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        };
        buf.truncate(read);
        Ok(buf)
    }

    fn is_local(&self) -> bool {
        match &self.inner {
            KxStreamInner::Tcp(_) => false,
            #[cfg(unix)]
            KxStreamInner::Unix(_) => true,
        }
    }
}

#[cfg(unix)]
fn peek_unix(stream: &std::os::unix::net::UnixStream, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::os::fd::AsRawFd;

    // SAFETY: `buf` is valid writable memory of `buf.len()` bytes and the
    // descriptor is an open socket owned by `stream` for the whole call.
    let rc = unsafe {
        libc::recv(
            stream.as_raw_fd(),
            buf.as_mut_ptr().cast::<libc::c_void>(),
            buf.len(),
            libc::MSG_PEEK,
        )
    };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(rc as usize)
}

#[cfg(unix)]
fn set_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let enable: libc::c_int = 1;
    // SAFETY: `enable` outlives the call and the length matches its type;
    // the descriptor is an open socket owned by `stream`.
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_KEEPALIVE,
            (&enable as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl std::fmt::Debug for KxStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KxStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
