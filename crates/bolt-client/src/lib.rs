//! Thin facade over `bolt-core`/`bolt-connection`/`bolt-stream`: the
//! surface a caller actually imports.

pub use bolt_connection::{Connection, ConnectionState};
pub use bolt_core::config::{AuthToken, DriverConfig, ProtocolVersion, Scheme, TlsMode};
pub use bolt_core::error::BoltError;
pub use bolt_core::message::{RunExtra, RunSummary, StreamSummary};
pub use bolt_core::packstream::Value;
pub use bolt_core::value::{
    Crs, Date, DateTime, Duration, LocalDateTime, LocalTime, Node, Path, Point, Relationship,
    Time, UnboundRelationship, Zone,
};
pub use bolt_stream::{RecordStream, ResponseEnvelope};

use std::collections::HashMap;

/// A connected, authenticated session. Owns the underlying
/// [`Connection`] and supplies the `fetch_size` default for every
/// stream it opens.
pub struct Session {
    connection: Connection,
    fetch_size: i64,
}

impl Session {
    /// Connects, negotiates a protocol version, and authenticates.
    pub async fn connect(config: &DriverConfig) -> Result<Self, BoltError> {
        let mut connection = Connection::connect(config).await?;
        let auth = config
            .auth
            .as_ref()
            .map(|a| a.to_auth_token())
            .unwrap_or_else(AuthToken::none);
        connection.hello(config.user_agent.clone(), &auth).await?;
        if connection.version.supports_logon() {
            connection.logon(&auth).await?;
        }
        Ok(Session {
            connection,
            fetch_size: config.default_fetch_size,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Runs a query and returns a lazy stream over its records.
    pub async fn run(
        &mut self,
        query: impl Into<String>,
        parameters: HashMap<String, Value>,
    ) -> Result<RecordStream<'_>, BoltError> {
        let summary = self
            .connection
            .run(query.into(), parameters, RunExtra::default())
            .await?;
        Ok(RecordStream::new(&mut self.connection, summary, self.fetch_size))
    }

    pub async fn begin(&mut self) -> Result<(), BoltError> {
        self.connection.begin(RunExtra::default()).await
    }

    pub async fn commit(&mut self) -> Result<(), BoltError> {
        self.connection.commit().await
    }

    pub async fn rollback(&mut self) -> Result<(), BoltError> {
        self.connection.rollback().await
    }

    pub async fn reset(&mut self) -> Result<(), BoltError> {
        self.connection.reset().await
    }

    pub async fn close(self) -> Result<(), BoltError> {
        self.connection.goodbye().await
    }
}
