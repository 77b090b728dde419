//! The connection state machine.
//!
//! `transition` is a pure function: given the current state and an
//! event, it returns the next state (or an error if the event isn't
//! legal there). The connection driver is the only caller; keeping the
//! table here, rather than scattered across `connection.rs`'s match
//! arms, makes the full transition set auditable in one place.

use bolt_core::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Negotiated,
    Unauthenticated,
    Ready,
    Streaming,
    TxReady,
    TxStreaming,
    Failed,
    Interrupted,
    Defunct,
}

/// The inputs that drive a state transition. Doesn't carry message
/// payloads — just enough shape to pick the next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    HandshakeComplete,
    HelloSuccess { supports_logon: bool },
    LogonSuccess,
    RunSuccess,
    PullHasMore,
    PullExhausted,
    DiscardSuccess,
    BeginSuccess,
    CommitOrRollbackSuccess,
    ResetSuccess,
    ServerFailure,
    /// Any request submitted while already Failed.
    InterruptedRequest,
    TransportLost,
}

impl ConnectionState {
    /// Pure transition function implementing the full table from the
    /// connection lifecycle: handshake → auth → run/pull/discard loop →
    /// transactions → failure/recovery.
    pub fn transition(self, event: Event) -> Result<ConnectionState, ProtocolError> {
        use ConnectionState::*;
        use Event::*;
        match (self, event) {
            (Disconnected, HandshakeComplete) => Ok(Negotiated),

            (Negotiated, HelloSuccess { supports_logon: true }) => Ok(Unauthenticated),
            (Negotiated, HelloSuccess { supports_logon: false }) => Ok(Ready),

            (Unauthenticated, LogonSuccess) => Ok(Ready),

            (Ready, RunSuccess) => Ok(Streaming),
            (Streaming, PullHasMore) => Ok(Streaming),
            (Streaming, PullExhausted) => Ok(Ready),
            (Streaming, DiscardSuccess) => Ok(Ready),

            (Ready, BeginSuccess) => Ok(TxReady),
            (TxReady, RunSuccess) => Ok(TxStreaming),
            (TxStreaming, PullExhausted) => Ok(TxReady),
            (TxStreaming, PullHasMore) => Ok(TxStreaming),
            (TxStreaming, DiscardSuccess) => Ok(TxReady),
            (TxReady, CommitOrRollbackSuccess) => Ok(Ready),

            // A FAILURE can arrive from almost any active state.
            (Ready | Streaming | TxReady | TxStreaming | Unauthenticated | Negotiated, ServerFailure) => {
                Ok(Failed)
            }

            (Failed, ResetSuccess) => Ok(Ready),
            (Failed, InterruptedRequest) => Ok(Interrupted),
            (Interrupted, InterruptedRequest) => Ok(Interrupted),
            (Interrupted, ResetSuccess) => Ok(Ready),

            (_, TransportLost) => Ok(Defunct),

            (state, event) => Err(ProtocolError::InvalidForState.with_context(state, event)),
        }
    }

    pub fn is_usable(self) -> bool {
        !matches!(self, ConnectionState::Failed | ConnectionState::Defunct)
    }
}

/// Narrow extension so the transition table can attach which
/// (state, event) pair was rejected without widening `ProtocolError`
/// itself — useful in logs, irrelevant to equality/matching elsewhere.
trait WithContext {
    fn with_context(self, state: ConnectionState, event: Event) -> Self;
}

impl WithContext for ProtocolError {
    fn with_context(self, state: ConnectionState, event: Event) -> Self {
        tracing::debug!(?state, ?event, "rejected state transition");
        self
    }
}
