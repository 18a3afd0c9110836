//! Blocking connections to a q/kdb+ process.
//!
//! A [`Connection`] owns a [`Transport`](qwire_transport::Transport),
//! negotiates the protocol level once, then exchanges framed messages.
//! Nothing here is retried; any error leaves the connection unusable and
//! the caller decides whether to reconnect.

pub mod connection;
pub mod error;
pub mod handshake;
mod io;

#[cfg(test)]
mod testing;

pub use connection::{ConnectOptions, Connection, Message};
pub use error::{ConnError, Result};
pub use handshake::{handshake, ConnectionState, HandshakeConfig};
