//! Forward-only scanner over a contiguous range of records.
//!
//! The scanner owns its stream handle for the whole session and borrows an
//! immutable [`Index`]. Chunks are decoded lazily as the cursor crosses into
//! them and held in a single slot; crossing a chunk boundary drops the previous
//! chunk. Once exhausted or failed the scanner never resumes.

use std::io::{Read, Seek};

use crate::error::{RecordIoError, Result};
use crate::index::Index;
use crate::io::ChunkDecoder;
use crate::io::chunk::{ChunkCodec, truncation_from_eof};
use crate::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Constructed; `advance` has not been called.
    Created,
    /// The last `advance` reported an available record.
    Scanning,
    /// The end of the range was reached without error.
    Exhausted,
    /// A stream or decode failure ended the scan; see [`RangeScanner::error`].
    Failed,
}

#[derive(Debug)]
struct CachedChunk {
    ordinal: usize,
    chunk: Chunk,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    record: u64,
    local: usize,
}

pub struct RangeScanner<'a, R, D = ChunkCodec> {
    reader: R,
    index: &'a Index,
    decoder: D,
    start: u64,
    end: u64,
    /// Global number of the record the next `advance` moves to.
    next: u64,
    current: Option<Cursor>,
    cached: Option<CachedChunk>,
    state: ScanState,
    err: Option<RecordIoError>,
    chunks_loaded: u64,
}

impl<'a, R: Read + Seek> RangeScanner<'a, R> {
    /// Scan records `[start, start + len)` with the built-in codec.
    ///
    /// A negative `start` scans from the first record. A negative `len`, or
    /// one reaching past the last record, scans to the end of the index.
    pub fn new(reader: R, index: &'a Index, start: i64, len: i64) -> Self {
        Self::with_decoder(reader, index, ChunkCodec::default(), start, len)
    }

    /// Scan every record in the index.
    pub fn full(reader: R, index: &'a Index) -> Self {
        Self::new(reader, index, 0, -1)
    }
}

impl<'a, R: Read + Seek, D: ChunkDecoder> RangeScanner<'a, R, D> {
    pub fn with_decoder(reader: R, index: &'a Index, decoder: D, start: i64, len: i64) -> Self {
        let total = index.num_records();
        let start = u64::try_from(start).unwrap_or(0);
        let end = match u64::try_from(len) {
            Ok(len) => start.saturating_add(len).min(total),
            Err(_) => total,
        };

        Self {
            reader,
            index,
            decoder,
            start,
            end,
            next: start,
            current: None,
            cached: None,
            state: ScanState::Created,
            err: None,
            chunks_loaded: 0,
        }
    }

    /// Move to the next record, decoding its chunk if it is not the cached one.
    ///
    /// Returns `false` when the range is exhausted or a failure occurred; check
    /// [`error`](Self::error) to tell the two apart.
    pub fn advance(&mut self) -> bool {
        if matches!(self.state, ScanState::Exhausted | ScanState::Failed) {
            return false;
        }

        let record = self.next;
        self.next = self.next.saturating_add(1);
        self.current = None;
        if record >= self.end {
            tracing::trace!(scan.start = self.start, scan.end = self.end, "scan exhausted");
            self.state = ScanState::Exhausted;
            self.cached = None;
            return false;
        }

        match self.load(record) {
            Ok(local) => {
                self.current = Some(Cursor { record, local });
                self.state = ScanState::Scanning;
                true
            }
            Err(err) => {
                tracing::error!(scan.record = record, error = %err, "range scan failed");
                self.state = ScanState::Failed;
                self.cached = None;
                self.err = Some(err);
                false
            }
        }
    }

    /// Ensure the chunk holding `record` is cached and return its local index.
    /// Decoded chunks are checked against the indexed record count, so the
    /// local index is always in bounds.
    fn load(&mut self, record: u64) -> Result<usize> {
        let location = self
            .index
            .locate(record)
            .ok_or_else(|| RecordIoError::Truncated {
                offset: 0,
                reason: format!("record {record} is not covered by the index"),
            })?;

        let cache_hit = self
            .cached
            .as_ref()
            .is_some_and(|cached| cached.ordinal == location.chunk);
        if cache_hit {
            tracing::trace!(scan.record = record, scan.chunk = location.chunk, "chunk cache hit");
        } else {
            // Drop the previous chunk before decoding the next one.
            self.cached = None;
            let chunk = self.decode(location.chunk)?;
            self.cached = Some(CachedChunk {
                ordinal: location.chunk,
                chunk,
            });
        }

        Ok(location.local)
    }

    fn decode(&mut self, ordinal: usize) -> Result<Chunk> {
        let offset = self.chunk_offset(ordinal)?;
        let chunk = self
            .decoder
            .decode_chunk(&mut self.reader, offset)
            .map_err(|err| truncation_from_eof(err, offset))?;
        self.chunks_loaded += 1;

        let declared = self
            .index
            .chunk_records()
            .get(ordinal)
            .copied()
            .unwrap_or_default();
        let held = chunk.len() as u64;
        if held < declared {
            return Err(RecordIoError::Truncated {
                offset,
                reason: format!("chunk holds {held} records, index declares {declared}"),
            });
        }
        if held > declared {
            return Err(RecordIoError::InvalidChunk {
                offset,
                reason: format!("chunk holds {held} records, index declares {declared}"),
            });
        }

        tracing::debug!(
            scan.chunk = ordinal,
            chunk.offset = offset,
            chunk.records = held,
            "loaded chunk"
        );
        Ok(chunk)
    }

    fn chunk_offset(&self, ordinal: usize) -> Result<u64> {
        let num_chunks = self.index.num_chunks();
        self.index
            .chunk_offset(ordinal)
            .map(|offset| offset as u64)
            .ok_or(RecordIoError::ChunkOutOfRange {
                ordinal,
                num_chunks,
            })
    }

    /// Payload of the record under the cursor.
    ///
    /// Only valid after an `advance` that returned `true`; otherwise
    /// [`RecordIoError::NoCurrentRecord`].
    pub fn record(&self) -> Result<&[u8]> {
        if self.state != ScanState::Scanning {
            return Err(RecordIoError::NoCurrentRecord);
        }
        let cursor = self.current.ok_or(RecordIoError::NoCurrentRecord)?;
        self.cached
            .as_ref()
            .and_then(|cached| cached.chunk.record(cursor.local))
            .ok_or(RecordIoError::NoCurrentRecord)
    }

    /// The failure that ended the scan. `None` while scanning and after normal
    /// exhaustion.
    #[must_use]
    pub fn error(&self) -> Option<&RecordIoError> {
        self.err.as_ref()
    }

    /// Consume the scanner, yielding the failure that ended the scan.
    ///
    /// `error()` keeps reporting the failure for as long as the scanner lives;
    /// ownership moves out only together with the scanner.
    #[must_use]
    pub fn into_error(self) -> Option<RecordIoError> {
        self.err
    }

    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Global number of the record under the cursor.
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        self.current.map(|cursor| cursor.record)
    }

    /// Effective `[start, end)` after clamping.
    #[must_use]
    pub fn range(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    /// Number of chunk decodes performed so far.
    #[must_use]
    pub fn chunks_loaded(&self) -> u64 {
        self.chunks_loaded
    }

    /// Release the stream handle.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::writer::ChunkWriter;
    use crate::types::{Compression, WriterOptions};
    use std::cell::Cell;
    use std::io::Cursor as IoCursor;

    fn record_bytes(i: u64) -> Vec<u8> {
        format!("record-{i:04}").into_bytes()
    }

    /// Chunks of 3 and 5 records: the 8-record layout used throughout.
    fn two_chunk_file() -> Vec<u8> {
        let options = WriterOptions::builder()
            .compression(Compression::Zstd)
            .build();
        let mut writer = ChunkWriter::with_options(Vec::new(), options).expect("writer");
        for i in 0..3 {
            writer.write(&record_bytes(i)).expect("write");
        }
        writer.flush_chunk().expect("flush");
        for i in 3..8 {
            writer.write(&record_bytes(i)).expect("write");
        }
        writer.finish().expect("finish")
    }

    struct CountingDecoder<'c> {
        inner: ChunkCodec,
        offsets: &'c Cell<Vec<u64>>,
    }

    impl ChunkDecoder for CountingDecoder<'_> {
        fn decode_chunk<T: Read + Seek>(&self, reader: &mut T, offset: u64) -> Result<Chunk> {
            let mut seen = self.offsets.take();
            seen.push(offset);
            self.offsets.set(seen);
            self.inner.decode_chunk(reader, offset)
        }
    }

    fn drain<R, D>(scanner: &mut RangeScanner<'_, R, D>) -> Vec<Vec<u8>>
    where
        R: Read + Seek,
        D: ChunkDecoder,
    {
        let mut out = Vec::new();
        while scanner.advance() {
            out.push(scanner.record().expect("record").to_vec());
        }
        out
    }

    #[test]
    fn full_scan_visits_every_record_then_exhausts_cleanly() {
        let bytes = two_chunk_file();
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");
        let mut scanner = RangeScanner::full(IoCursor::new(&bytes), &index);

        let records = drain(&mut scanner);
        assert_eq!(records, (0..8).map(record_bytes).collect::<Vec<_>>());
        assert_eq!(scanner.state(), ScanState::Exhausted);
        assert!(scanner.error().is_none());
        assert!(!scanner.advance(), "no resumption after exhaustion");
        assert_eq!(scanner.chunks_loaded(), 2);
    }

    #[test]
    fn crossing_one_boundary_decodes_second_chunk_once() {
        let bytes = two_chunk_file();
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");
        let offsets = Cell::new(Vec::new());
        let decoder = CountingDecoder {
            inner: ChunkCodec::new(),
            offsets: &offsets,
        };
        let mut scanner = RangeScanner::with_decoder(IoCursor::new(&bytes), &index, decoder, 2, 4);

        let mut visited = Vec::new();
        while scanner.advance() {
            visited.push(scanner.position().expect("position"));
            let expected = record_bytes(scanner.position().expect("position"));
            assert_eq!(scanner.record().expect("record"), expected.as_slice());
        }
        assert_eq!(visited, vec![2, 3, 4, 5]);
        assert!(scanner.error().is_none());

        let decoded = offsets.take();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1], index.chunk_offset(1).expect("chunk 1") as u64);
    }

    #[test]
    fn range_bounds_are_clamped() {
        let bytes = two_chunk_file();
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");

        let mut scanner = RangeScanner::new(IoCursor::new(&bytes), &index, -5, 2);
        assert_eq!(scanner.range(), (0, 2));
        assert_eq!(drain(&mut scanner).len(), 2);

        let mut scanner = RangeScanner::new(IoCursor::new(&bytes), &index, 6, 100);
        assert_eq!(scanner.range(), (6, 8));
        assert_eq!(drain(&mut scanner), vec![record_bytes(6), record_bytes(7)]);

        let mut scanner = RangeScanner::new(IoCursor::new(&bytes), &index, 5, -1);
        assert_eq!(drain(&mut scanner).len(), 3);

        let mut scanner = RangeScanner::new(IoCursor::new(&bytes), &index, 20, 3);
        assert!(!scanner.advance());
        assert!(scanner.error().is_none());
        assert_eq!(scanner.chunks_loaded(), 0);
    }

    #[test]
    fn record_before_advance_is_contract_violation() {
        let bytes = two_chunk_file();
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");
        let mut scanner = RangeScanner::new(IoCursor::new(&bytes), &index, 0, 1);

        assert_eq!(scanner.state(), ScanState::Created);
        assert!(matches!(scanner.record(), Err(RecordIoError::NoCurrentRecord)));
        assert!(scanner.advance());
        assert!(scanner.record().is_ok());
        assert!(!scanner.advance());
        assert!(matches!(scanner.record(), Err(RecordIoError::NoCurrentRecord)));
    }

    #[test]
    fn truncated_stream_fails_mid_range() {
        let bytes = two_chunk_file();
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");
        let second = index.chunk_offset(1).expect("chunk 1") as usize;
        let cut = bytes[..second + 10].to_vec();

        let mut scanner = RangeScanner::full(IoCursor::new(cut), &index);
        assert_eq!(drain(&mut scanner).len(), 3);
        assert_eq!(scanner.state(), ScanState::Failed);
        let err = scanner.error().expect("truncation must be reported");
        assert!(err.is_corruption(), "unexpected error: {err:?}");
        assert!(!scanner.advance(), "no resumption after failure");
    }

    #[test]
    fn chunk_with_fewer_records_than_indexed_is_truncation() {
        let bytes = two_chunk_file();
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");

        struct ShortDecoder;
        impl ChunkDecoder for ShortDecoder {
            fn decode_chunk<T: Read + Seek>(&self, _: &mut T, _: u64) -> Result<Chunk> {
                Ok(Chunk::new(vec![b"only".to_vec()]))
            }
        }

        let mut scanner =
            RangeScanner::with_decoder(IoCursor::new(&bytes), &index, ShortDecoder, 0, -1);
        assert!(!scanner.advance());
        assert!(matches!(
            scanner.into_error(),
            Some(RecordIoError::Truncated { offset: 0, .. })
        ));
    }

    #[test]
    fn failed_scanner_keeps_reporting_its_error() {
        let mut writer = ChunkWriter::new(Vec::new()).expect("writer");
        writer.write(b"single record").expect("write");
        let mut bytes = writer.finish().expect("finish");
        let index = Index::build(&mut IoCursor::new(&bytes)).expect("index");
        bytes.pop();

        let mut scanner = RangeScanner::full(IoCursor::new(bytes), &index);
        assert!(!scanner.advance());
        for _ in 0..2 {
            assert_eq!(scanner.state(), ScanState::Failed);
            assert!(scanner.error().is_some(), "failed scan must keep its error");
            assert!(!scanner.advance());
        }
        assert!(matches!(
            scanner.into_error(),
            Some(RecordIoError::Truncated { offset: 0, .. })
        ));
    }
}
