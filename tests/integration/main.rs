//! Integration tests driving the full stack — handshake, RUN/PULL,
//! early termination, and failure recovery — against an in-process
//! mock Bolt server. There's no live Neo4j in this environment, so the
//! mock plays the part a real server would for each scripted exchange.

mod server;

mod handshake;
mod failure_recovery;
mod streaming;
