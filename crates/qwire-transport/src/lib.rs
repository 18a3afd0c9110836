//! Blocking stream transports for the qwire IPC client.
//!
//! The protocol engine only ever talks to a [`Transport`]: a blocking byte
//! pipe that can send, receive, peek, and report whether it is a same-host
//! connection. [`KxStream`] is the production implementation over TCP or a
//! Unix domain socket.
//!
//! This is the lowest layer of qwire. Everything else builds on the
//! [`Transport`] trait defined here.

pub mod error;
pub mod local;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use stream::KxStream;
pub use traits::Transport;
