//! Export of normalized records for display.

use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, TriageError};
use crate::models::{ArtifactKind, ArtifactRecord};

/// Receives record batches, one call per artifact kind
pub trait RecordSink {
    /// Write one batch under a free-form label
    fn write_batch(&mut self, label: &str, records: &[ArtifactRecord]) -> Result<()>;

    fn write_records(&mut self, kind: ArtifactKind, records: &[ArtifactRecord]) -> Result<()> {
        self.write_batch(kind.as_str(), records)
    }

    /// Called once after the last batch
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct Batch<'a> {
    kind: &'a str,
    count: usize,
    records: &'a [ArtifactRecord],
}

/// Pretty JSON, one object per batch
pub struct JsonSink<W: Write> {
    writer: W,
    batches: usize,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, batches: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonSink<BufWriter<File>> {
    /// Sink writing to a new file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| TriageError::from_io(path.display().to_string(), e))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RecordSink for JsonSink<W> {
    fn write_batch(&mut self, label: &str, records: &[ArtifactRecord]) -> Result<()> {
        let batch = Batch {
            kind: label,
            count: records.len(),
            records,
        };
        serde_json::to_writer_pretty(&mut self.writer, &batch)?;
        self.writer.write_all(b"\n")?;
        self.batches += 1;
        debug!("Exported {} {} records", records.len(), label);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        debug!("Export finished after {} batches", self.batches);
        Ok(())
    }
}
