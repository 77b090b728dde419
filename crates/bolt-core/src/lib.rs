//! Protocol-level building blocks for speaking Bolt to a Neo4j server:
//! the PackStream codec, chunked transport framing, handshake
//! negotiation, the versioned message catalog, and domain value types.
//!
//! This crate performs no I/O. `bolt-connection` owns the socket and
//! drives these pure functions against it.

pub mod config;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod message;
pub mod packstream;
pub mod value;

pub use config::{AuthToken, DriverConfig, ProtocolVersion, Scheme, TlsMode};
pub use error::{BoltError, CodecError, HandshakeError, ProtocolError};
pub use message::{ClientMessage, RunExtra, RunSummary, ServerMessage, StreamSummary};
pub use packstream::Value;
