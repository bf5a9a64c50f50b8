//! Document sinks.

use std::io::Write;

use osm_import_document_models::Document;

/// Errors from writing documents. Fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination of pipeline output.
pub trait DocumentSink {
    /// Writes one document.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the document cannot be written.
    fn write(&mut self, doc: &Document) -> Result<(), SinkError>;

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if flushing fails.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one JSON document per line.
pub struct NdjsonSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DocumentSink for NdjsonSink<W> {
    fn write(&mut self, doc: &Document) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, doc)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl DocumentSink for Vec<Document> {
    fn write(&mut self, doc: &Document) -> Result<(), SinkError> {
        self.push(doc.clone());
        Ok(())
    }
}
