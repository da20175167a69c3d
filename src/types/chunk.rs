//! Chunk-level value types shared by the codec, the index and the scanner.

use super::options::Compression;

/// Decoded chunk header. Produced per decode call and never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub num_records: u32,
    /// Byte length of the (possibly compressed) payload following the header.
    pub compressed_size: u32,
    pub compression: Compression,
    pub checksum: [u8; 32],
}

/// Outcome of reading a header at the current stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRead {
    Header(ChunkHeader),
    /// No bytes were left at the header position.
    EndOfStream,
}

/// Records of one decoded chunk, in on-disk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    records: Vec<Vec<u8>>,
}

impl Chunk {
    #[must_use]
    pub fn new(records: Vec<Vec<u8>>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn record(&self, local: usize) -> Option<&[u8]> {
        self.records.get(local).map(Vec::as_slice)
    }

    #[must_use]
    pub fn records(&self) -> &[Vec<u8>] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Vec<u8>> {
        self.records
    }
}

/// Position of a global record: owning chunk ordinal and index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordLocation {
    pub chunk: usize,
    pub local: usize,
}
