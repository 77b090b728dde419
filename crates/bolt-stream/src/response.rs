//! The bundle a fully-drained stream leaves behind: declared field
//! names, every record the caller consumed, and the terminal metadata
//! attached to the closing `SUCCESS`.

use bolt_core::message::StreamSummary;
use bolt_core::packstream::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub fields: Vec<String>,
    pub records: Vec<Vec<Value>>,
    pub summary: StreamSummary,
}

impl ResponseEnvelope {
    /// Zips each record with `fields` into a `{name: value}` row. This
    /// is a convenience for callers that want map-shaped records instead
    /// of positional ones; the wire and `RecordStream` both deal only in
    /// positional `Vec<Value>` rows.
    pub fn rows(&self) -> Vec<std::collections::HashMap<String, Value>> {
        self.records
            .iter()
            .map(|record| {
                self.fields
                    .iter()
                    .cloned()
                    .zip(record.iter().cloned())
                    .collect()
            })
            .collect()
    }
}
