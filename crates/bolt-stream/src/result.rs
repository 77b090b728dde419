//! The result streaming engine: backpressured `PULL` batching,
//! DISCARD-based cancellation, and exhaustion bookkeeping.
//!
//! A `RecordStream` issues its first `PULL` lazily, on the first call to
//! [`RecordStream::next`], and only issues another once its local buffer
//! is empty and the caller asks for more — never further ahead than
//! `fetch_size` records. There's no async `Drop` in Rust, so early
//! termination is an explicit call to [`RecordStream::close`] rather
//! than an implicit one; a caller that stops iterating without calling
//! it leaves the connection mid-stream for the next request to sort
//! out. `bolt-client` is expected to call `close` whenever it discards a
//! stream it didn't fully consume.

use std::collections::VecDeque;

use bolt_core::error::BoltError;
use bolt_core::message::{RunSummary, StreamSummary};
use bolt_core::packstream::Value;
use bolt_connection::Connection;

use crate::response::ResponseEnvelope;

enum Source<'a> {
    Connected {
        conn: &'a mut Connection,
        qid: i64,
        fetch_size: i64,
    },
    /// The full record list was already materialized (e.g. replayed from
    /// a cache); no further I/O is ever performed.
    Buffered,
}

pub struct RecordStream<'a> {
    fields: Vec<String>,
    buffer: VecDeque<Vec<Value>>,
    exhausted: bool,
    source: Source<'a>,
    summary: Option<StreamSummary>,
}

impl<'a> RecordStream<'a> {
    /// Begins a stream against a connection that just completed `RUN`.
    pub fn new(conn: &'a mut Connection, run_summary: RunSummary, fetch_size: i64) -> Self {
        RecordStream {
            fields: run_summary.fields,
            buffer: VecDeque::new(),
            exhausted: false,
            source: Source::Connected {
                conn,
                qid: run_summary.qid,
                fetch_size,
            },
            summary: None,
        }
    }

    /// Wraps an already-materialized record set: no I/O, no `DISCARD` on
    /// early termination, the same iteration contract.
    pub fn from_buffered(
        fields: Vec<String>,
        records: Vec<Vec<Value>>,
        summary: StreamSummary,
    ) -> RecordStream<'static> {
        RecordStream {
            fields,
            buffer: VecDeque::from(records),
            exhausted: true,
            source: Source::Buffered,
            summary: Some(summary),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Available only once the stream has reported terminal metadata
    /// (via [`RecordStream::next`] returning `None`, or a buffered
    /// stream, which starts out exhausted).
    pub fn summary(&self) -> Option<&StreamSummary> {
        self.summary.as_ref()
    }

    /// Yields the next record, issuing a `PULL` batch when the local
    /// buffer is empty and the stream isn't exhausted. Returns `None`
    /// once the terminal `SUCCESS` (has_more=false) has been consumed.
    pub async fn next(&mut self) -> Result<Option<Vec<Value>>, BoltError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.exhausted {
                return Ok(None);
            }
            match &mut self.source {
                Source::Buffered => {
                    self.exhausted = true;
                    return Ok(None);
                }
                Source::Connected { conn, qid, fetch_size } => {
                    let (records, summary) = conn.pull(*fetch_size, *qid).await?;
                    self.exhausted = !summary.has_more;
                    self.summary = Some(summary);
                    self.buffer.extend(records);
                }
            }
        }
    }

    /// Drains every remaining record into a [`ResponseEnvelope`].
    pub async fn collect(mut self) -> Result<ResponseEnvelope, BoltError> {
        let fields = self.fields.clone();
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        let summary = self.summary.clone().unwrap_or_default();
        Ok(ResponseEnvelope {
            fields,
            records,
            summary,
        })
    }

    /// Stops iteration early. If the stream hasn't reached its terminal
    /// `SUCCESS` yet, issues a `DISCARD` for the remaining records
    /// (`n: -1` — discard all) and drains to the connection's `Ready`
    /// state. A no-op on an already-exhausted or buffered stream.
    pub async fn close(mut self) -> Result<StreamSummary, BoltError> {
        if !self.exhausted {
            if let Source::Connected { conn, qid, .. } = &mut self.source {
                let summary = conn.discard(-1, *qid).await?;
                self.exhausted = true;
                self.summary = Some(summary);
            }
        }
        Ok(self.summary.unwrap_or_default())
    }
}
