//! Address resolution and same-host detection.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Resolve `host:port` to every address the resolver returns.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::Resolve {
            host: host.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
        });
    }
    Ok(addrs)
}

/// Addresses the local hostname resolves to. Computed once per process.
pub fn local_addresses() -> &'static [IpAddr] {
    static LOCAL: OnceLock<Vec<IpAddr>> = OnceLock::new();
    LOCAL.get_or_init(|| {
        let Some(name) = hostname() else {
            return Vec::new();
        };
        match (name.as_str(), 0u16).to_socket_addrs() {
            Ok(addrs) => {
                let ips: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
                debug!(hostname = %name, count = ips.len(), "resolved local addresses");
                ips
            }
            Err(err) => {
                debug!(hostname = %name, error = %err, "could not resolve local hostname");
                Vec::new()
            }
        }
    })
}

/// True if `ip` is a loopback address or one of `local`.
pub fn is_local_address(ip: IpAddr, local: &[IpAddr]) -> bool {
    ip.is_loopback() || local.contains(&ip)
}

/// Filesystem path of the Unix domain socket a server on `port` listens on.
pub fn unix_socket_path(port: u16) -> PathBuf {
    PathBuf::from(format!("/tmp/kx.{port}"))
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    // Host names are limited to 255 bytes plus the terminator.
    let mut buf = [0u8; 256];
    // SAFETY: `buf` is a valid writable buffer of `buf.len()` bytes for the
    // duration of the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).ok()
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}
