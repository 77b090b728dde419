//! Result streaming: turns a connection mid-`RUN` into a lazy,
//! cancellable sequence of records.

pub mod response;
pub mod result;

pub use response::ResponseEnvelope;
pub use result::RecordStream;
