//! Owns the socket: resolves a [`bolt_core::config::DriverConfig`] into
//! a live, authenticated [`Connection`] and drives requests/responses
//! across it.

pub mod connection;
pub mod handshake;
pub mod state;
pub mod transport;

pub use connection::Connection;
pub use state::{ConnectionState, Event};
pub use transport::{AsyncStream, BoxedStream, TransportError};
