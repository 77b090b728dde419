//! The connection: owns a socket and a request/response dispatch loop.
//!
//! Every method here both writes exactly one client message and reads
//! back its response(s) before returning — Bolt's request/response
//! pairing is strictly FIFO, so there is never a need for a background
//! task or a mailbox of in-flight requests. `bolt-stream` builds the
//! batching/cancellation policy for PULL on top of the primitives
//! exposed here.

use std::collections::HashMap;

use bolt_core::config::{AuthToken, DriverConfig, ProtocolVersion};
use bolt_core::error::{BoltError, ProtocolError};
use bolt_core::framing::{write_chunked, Dechunker};
use bolt_core::message::{ClientMessage, RunExtra, RunSummary, ServerMessage, StreamSummary};
use bolt_core::packstream::{decode_value, encode_value, Reader, Value};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::handshake::negotiate;
use crate::state::{ConnectionState, Event};
use crate::transport::{self, BoxedStream};

const READ_CHUNK: usize = 4096;

pub struct Connection {
    stream: BoxedStream,
    pub version: ProtocolVersion,
    state: ConnectionState,
    dechunker: Dechunker,
    read_buf: [u8; READ_CHUNK],
}

impl Connection {
    /// Opens the TCP/TLS socket and runs the handshake. The returned
    /// connection is in `Negotiated` state; call [`Connection::hello`]
    /// before issuing any other request.
    pub async fn connect(config: &DriverConfig) -> Result<Self, BoltError> {
        tracing::debug!(host = %config.host, port = config.port, "opening connection");
        let mut stream = transport::connect(&config.host, config.port, config.tls_mode)
            .await
            .map_err(|e| BoltError::Transport(e.to_string()))?;
        let version = negotiate(&mut stream, &config.candidate_versions).await?;
        tracing::debug!(%version, "connection negotiated");
        Ok(Connection {
            stream,
            version,
            state: ConnectionState::Disconnected
                .transition(Event::HandshakeComplete)
                .expect("Disconnected -> HandshakeComplete is always legal"),
            dechunker: Dechunker::new(),
            read_buf: [0u8; READ_CHUNK],
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), BoltError> {
        let value = message.into_value(self.version);
        let mut payload = BytesMut::new();
        encode_value(&value, &mut payload);
        let mut framed = BytesMut::new();
        write_chunked(&payload, &mut framed);
        self.stream
            .write_all(&framed)
            .await
            .map_err(|e| BoltError::Transport(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| BoltError::Transport(e.to_string()))?;
        Ok(())
    }

    /// Reads and decodes exactly one server message, pulling more bytes
    /// off the socket until the dechunker has a complete one.
    async fn recv(&mut self) -> Result<ServerMessage, BoltError> {
        loop {
            let n = self
                .stream
                .read(&mut self.read_buf)
                .await
                .map_err(|e| BoltError::Transport(e.to_string()))?;
            if n == 0 {
                return Err(BoltError::Transport("connection closed by peer".into()));
            }
            let messages = self
                .dechunker
                .feed(&self.read_buf[..n])
                .map_err(BoltError::Codec)?;
            if let Some(bytes) = messages.into_iter().next() {
                let mut reader = Reader::new(&bytes);
                let value = decode_value(&mut reader).map_err(BoltError::Codec)?;
                return Ok(ServerMessage::decode(value)?);
            }
        }
    }

    /// Advances the state machine on a server failure and surfaces a
    /// `ServerFailure` error to the caller.
    fn handle_failure(&mut self, code: String, message: String) -> BoltError {
        tracing::warn!(%code, %message, "server reported a failure");
        self.state = self
            .state
            .transition(Event::ServerFailure)
            .unwrap_or(ConnectionState::Failed);
        BoltError::ServerFailure { code, message }
    }

    fn handle_ignored(&mut self) -> BoltError {
        tracing::debug!(state = ?self.state, "server ignored a request");
        self.state = self
            .state
            .transition(Event::InterruptedRequest)
            .unwrap_or(ConnectionState::Interrupted);
        BoltError::Protocol(ProtocolError::UnexpectedIgnored)
    }

    pub async fn hello(&mut self, user_agent: String, auth: &AuthToken) -> Result<(), BoltError> {
        let supports_logon = self.version.supports_logon();
        let message = ClientMessage::Hello {
            user_agent,
            auth: auth.clone(),
            routing: None,
            bolt_agent: None,
        };
        self.send(message).await?;
        match self.recv().await? {
            ServerMessage::Success(_) => {
                self.state = self.state.transition(Event::HelloSuccess { supports_logon })?;
                Ok(())
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    pub async fn logon(&mut self, auth: &AuthToken) -> Result<(), BoltError> {
        self.send(ClientMessage::Logon { auth: auth.clone() }).await?;
        match self.recv().await? {
            ServerMessage::Success(_) => {
                self.state = self.state.transition(Event::LogonSuccess)?;
                Ok(())
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    async fn run_internal(
        &mut self,
        query: String,
        parameters: HashMap<String, Value>,
        extra: RunExtra,
        success_event: Event,
    ) -> Result<RunSummary, BoltError> {
        self.send(ClientMessage::Run {
            query,
            parameters,
            extra,
        })
        .await?;
        match self.recv().await? {
            ServerMessage::Success(metadata) => {
                self.state = self.state.transition(success_event)?;
                Ok(RunSummary::from_metadata(metadata))
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    pub async fn run(
        &mut self,
        query: String,
        parameters: HashMap<String, Value>,
        extra: RunExtra,
    ) -> Result<RunSummary, BoltError> {
        self.run_internal(query, parameters, extra, Event::RunSuccess).await
    }

    pub async fn begin(&mut self, extra: RunExtra) -> Result<(), BoltError> {
        self.send(ClientMessage::Begin { extra }).await?;
        match self.recv().await? {
            ServerMessage::Success(_) => {
                self.state = self.state.transition(Event::BeginSuccess)?;
                Ok(())
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    async fn end_transaction(&mut self, message: ClientMessage) -> Result<(), BoltError> {
        self.send(message).await?;
        match self.recv().await? {
            ServerMessage::Success(_) => {
                self.state = self.state.transition(Event::CommitOrRollbackSuccess)?;
                Ok(())
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    pub async fn commit(&mut self) -> Result<(), BoltError> {
        self.end_transaction(ClientMessage::Commit).await
    }

    pub async fn rollback(&mut self) -> Result<(), BoltError> {
        self.end_transaction(ClientMessage::Rollback).await
    }

    /// Issues `PULL`, collecting `RECORD`s until the terminal `SUCCESS`
    /// (or `FAILURE`). Returns the decoded records plus the stream's
    /// terminal metadata.
    pub async fn pull(&mut self, n: i64, qid: i64) -> Result<(Vec<Vec<Value>>, StreamSummary), BoltError> {
        self.send(ClientMessage::Pull { n, qid }).await?;
        let mut records = Vec::new();
        loop {
            match self.recv().await? {
                ServerMessage::Record(values) => records.push(values),
                ServerMessage::Success(metadata) => {
                    let summary = StreamSummary::from_metadata(metadata);
                    let event = if summary.has_more {
                        Event::PullHasMore
                    } else {
                        Event::PullExhausted
                    };
                    self.state = self.state.transition(event)?;
                    return Ok((records, summary));
                }
                ServerMessage::Failure { code, message } => return Err(self.handle_failure(code, message)),
                ServerMessage::Ignored => return Err(self.handle_ignored()),
            }
        }
    }

    /// Issues `DISCARD`, dropping any remaining `RECORD`s server-side,
    /// and drains them client-side until the terminal `SUCCESS`.
    pub async fn discard(&mut self, n: i64, qid: i64) -> Result<StreamSummary, BoltError> {
        self.send(ClientMessage::Discard { n, qid }).await?;
        loop {
            match self.recv().await? {
                ServerMessage::Record(_) => continue,
                ServerMessage::Success(metadata) => {
                    self.state = self.state.transition(Event::DiscardSuccess)?;
                    return Ok(StreamSummary::from_metadata(metadata));
                }
                ServerMessage::Failure { code, message } => return Err(self.handle_failure(code, message)),
                ServerMessage::Ignored => return Err(self.handle_ignored()),
            }
        }
    }

    /// RESET returns the connection to `Ready` from `Failed`/`Interrupted`,
    /// dropping any open streams server-side.
    pub async fn reset(&mut self) -> Result<(), BoltError> {
        self.send(ClientMessage::Reset).await?;
        match self.recv().await? {
            ServerMessage::Success(_) => {
                self.state = self.state.transition(Event::ResetSuccess)?;
                Ok(())
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    /// `ACK_FAILURE`, the pre-3.0 equivalent of `RESET` for clearing a
    /// `Failed` connection without dropping open streams.
    pub async fn ack_failure(&mut self) -> Result<(), BoltError> {
        self.send(ClientMessage::AckFailure).await?;
        match self.recv().await? {
            ServerMessage::Success(_) => {
                self.state = self.state.transition(Event::ResetSuccess)?;
                Ok(())
            }
            ServerMessage::Failure { code, message } => Err(self.handle_failure(code, message)),
            ServerMessage::Ignored => Err(self.handle_ignored()),
            ServerMessage::Record(_) => Err(BoltError::Protocol(ProtocolError::InvalidForState)),
        }
    }

    /// Sends `GOODBYE`, which has no response — the server closes the
    /// socket on receipt.
    pub async fn goodbye(mut self) -> Result<(), BoltError> {
        self.send(ClientMessage::Goodbye).await?;
        let _ = self.stream.shutdown().await;
        Ok(())
    }
}
