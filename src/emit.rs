//! Structured record emission.
//!
//! Every reportable event becomes exactly one JSON object on one line:
//! `{"result": ...}` for a decoded payload, `{"info": ...}` for
//! informational messages, `{"error": ...}` for failures. The sink flushes
//! after every record so a consumer reading the stream incrementally sees
//! events without buffering delay.

use std::io::Write;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One reportable event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanRecord {
    /// A newly reportable decoded payload.
    Result(String),
    /// Informational message, e.g. enumerated camera indices at startup.
    Info(String),
    /// Fatal or recoverable error description.
    Error(String),
}

/// Destination for scan records.
pub trait RecordSink {
    fn emit(&mut self, record: &ScanRecord) -> Result<()>;
}

/// Sink writing one JSON object per line, flushed per record.
pub struct JsonLineSink<W: Write> {
    out: W,
}

impl JsonLineSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RecordSink for JsonLineSink<W> {
    fn emit(&mut self, record: &ScanRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("serialize scan record")?;
        writeln!(self.out, "{}", line).context("write scan record")?;
        self.out.flush().context("flush scan record")?;
        Ok(())
    }
}

/// In-memory sink for tests.
///
/// Clones share one buffer, so a test can keep a handle while the session
/// owns the sink.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: std::rc::Rc<std::cell::RefCell<Vec<ScanRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ScanRecord> {
        self.records.borrow().clone()
    }
}

impl RecordSink for MemorySink {
    fn emit(&mut self, record: &ScanRecord) -> Result<()> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
