use std::io::Write;

use super::chunk::ChunkCodec;
use crate::constants::RECORD_LEN_PREFIX;
use crate::error::{RecordIoError, Result};
use crate::types::WriterOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterStats {
    pub chunks_written: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub pending_records: usize,
}

/// Sequential chunk writer.
///
/// Records are buffered until the pending chunk reaches one of the limits in
/// [`WriterOptions`], then encoded and appended to the inner writer. Call
/// [`finish`](Self::finish) to emit the final partial chunk; dropping the writer
/// discards any pending records.
#[derive(Debug)]
pub struct ChunkWriter<W: Write> {
    inner: W,
    options: WriterOptions,
    pending: Vec<Vec<u8>>,
    pending_bytes: usize,
    chunks_written: u64,
    records_written: u64,
    bytes_written: u64,
}

impl<W: Write> ChunkWriter<W> {
    pub fn new(inner: W) -> Result<Self> {
        Self::with_options(inner, WriterOptions::default())
    }

    pub fn with_options(inner: W, options: WriterOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            inner,
            options,
            pending: Vec::new(),
            pending_bytes: 0,
            chunks_written: 0,
            records_written: 0,
            bytes_written: 0,
        })
    }

    /// Buffer one record, emitting the pending chunk once a limit is reached.
    ///
    /// Records whose framed size exceeds `max_record_bytes` are rejected and
    /// leave the pending chunk untouched.
    pub fn write(&mut self, record: &[u8]) -> Result<()> {
        let framed = record.len().saturating_add(RECORD_LEN_PREFIX);
        if framed > self.options.max_record_bytes {
            return Err(RecordIoError::InvalidOptions {
                reason: format!(
                    "record of {} bytes exceeds max_record_bytes of {}",
                    record.len(),
                    self.options.max_record_bytes
                ),
            });
        }
        self.pending.push(record.to_vec());
        self.pending_bytes += framed;

        if self.pending.len() >= self.options.max_records_per_chunk as usize
            || self.pending_bytes >= self.options.max_chunk_bytes
        {
            self.flush_chunk()?;
        }
        Ok(())
    }

    /// Emit the pending records as a chunk now. No-op when nothing is pending.
    pub fn flush_chunk(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let bytes =
            ChunkCodec::encode(&self.pending, self.options.compression, self.options.zstd_level)?;
        self.inner.write_all(&bytes)?;

        tracing::debug!(
            writer.chunk = self.chunks_written,
            writer.records = self.pending.len(),
            writer.raw_bytes = self.pending_bytes,
            writer.chunk_bytes = bytes.len(),
            "chunk written"
        );
        self.chunks_written += 1;
        self.records_written += self.pending.len() as u64;
        self.bytes_written += bytes.len() as u64;
        self.pending.clear();
        self.pending_bytes = 0;
        Ok(())
    }

    /// Emit the last partial chunk, flush, and hand back the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.flush_chunk()?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            chunks_written: self.chunks_written,
            records_written: self.records_written,
            bytes_written: self.bytes_written,
            pending_records: self.pending.len(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }
}
