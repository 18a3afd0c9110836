//! Blocking client for the q/kdb+ IPC protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking TCP / Unix domain socket streams
//! - [`proto`]: framing, compression and typed serialization, no I/O
//! - [`conn`]: handshake and request/response messaging (behind `conn` feature)
//!
//! ```no_run
//! # #[cfg(feature = "conn")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use qwire::conn::{Connection, HandshakeConfig};
//! use qwire::proto::wire;
//!
//! let mut conn = Connection::connect("localhost", 5001, &HandshakeConfig::default())?;
//! let query = conn.serializer().vector::<wire::Char, _>(b"til 3".iter().copied())?;
//! let reply = conn.send_sync(query)?;
//! let values = qwire::proto::deserialize_vector::<wire::Long>(&reply.payload)?;
//! assert_eq!(values, vec![0, 1, 2]);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "conn"))]
//! # fn main() {}
//! ```

/// Re-export transport types.
pub mod transport {
    pub use qwire_transport::*;
}

/// Re-export wire format types.
pub mod proto {
    pub use qwire_proto::*;
}

/// Re-export connection types (requires `conn` feature).
#[cfg(feature = "conn")]
pub mod conn {
    pub use qwire_conn::*;
}
