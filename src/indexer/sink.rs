//! Hand-off of finished records to the index collaborator.
//!
//! The index itself (embedding, vector storage) lives outside this crate.
//! [`CorpusSink`] is the seam it plugs into; [`JsonLinesSink`] streams
//! records as one JSON object per line for external loaders.

use std::io::Write;

use crate::error::Result;
use crate::types::CorpusRecord;

/// Receiver of corpus records. `upsert` must be idempotent per `record.id`.
pub trait CorpusSink {
    fn upsert(&mut self, record: &CorpusRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Write one JSON object per record.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CorpusSink for JsonLinesSink<W> {
    fn upsert(&mut self, record: &CorpusRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink, mostly for tests.
impl CorpusSink for Vec<CorpusRecord> {
    fn upsert(&mut self, record: &CorpusRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Push every record into `sink`, then flush. Returns the record count.
pub fn write_all<S, I>(sink: &mut S, records: I) -> Result<usize>
where
    S: CorpusSink + ?Sized,
    I: IntoIterator<Item = CorpusRecord>,
{
    let mut count = 0;
    for record in records {
        sink.upsert(&record)?;
        count += 1;
    }
    sink.flush()?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
