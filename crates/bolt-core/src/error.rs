//! Error taxonomy for the Bolt core.
//!
//! One enum per the kinds enumerated in the specification: handshake,
//! transport, codec, protocol, server-reported failures, and version
//! mismatches. Transport and codec errors are always fatal to the
//! connection; server failures are recoverable via RESET/ACK_FAILURE.

use crate::config::ProtocolVersion;

/// Errors that can arise anywhere in the Bolt core: codec, message
/// catalog, handshake negotiation, or protocol state tracking.
#[derive(Debug, thiserror::Error)]
pub enum BoltError {
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("server failure [{code}]: {message}")]
    ServerFailure { code: String, message: String },

    #[error("message not supported on protocol version {0}")]
    UnsupportedVersion(ProtocolVersion),
}

/// Errors specific to the magic-preamble / version-negotiation phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("bad magic preamble: expected 60 60 B0 17")]
    BadPreamble,

    #[error("server rejected every candidate version")]
    NoAcceptableVersion,

    #[error("server returned unparseable version bytes")]
    MalformedResponse,

    #[error("i/o error during handshake: {0}")]
    Io(String),
}

/// Errors raised by the PackStream codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown PackStream marker byte: 0x{0:02x}")]
    UnknownMarker(u8),

    #[error("map key must be a String, found a different value type")]
    NonStringMapKey,

    #[error("structure field count {actual} does not match marker-declared arity {expected}")]
    StructArityMismatch { expected: usize, actual: usize },

    #[error("buffer exhausted while decoding: needed {needed} more byte(s)")]
    UnexpectedEof { needed: usize },

    #[error("invalid UTF-8 in PackStream string")]
    InvalidUtf8,

    #[error("length {0} exceeds the encodable maximum for this marker family")]
    LengthOverflow(usize),
}

/// Errors raised when a message is sent/received out of turn for the
/// current connection state, or carries an unrecognized signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("message not valid in current state")]
    InvalidForState,

    #[error("unknown message signature: 0x{0:02x}")]
    UnknownSignature(u8),

    #[error("received IGNORED while connection was not Failed/Interrupted")]
    UnexpectedIgnored,

    #[error("expected a Structure value for message decoding, found a different kind")]
    NotAStructure,

    #[error("malformed domain value: {0}")]
    MalformedValue(String),
}
