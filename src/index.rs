//! Chunk index built from a single forward pass over chunk headers.
//!
//! Building an index reads only headers and seeks over payloads, so its cost
//! scales with the number of chunks rather than the volume of record data.
//! Once built the index is immutable and may be shared by any number of
//! [`RangeScanner`](crate::RangeScanner)s, each owning its own stream handle.
//!
//! Persisted layout (bincode, fixed-width little-endian integers), in order:
//! `chunk_offsets: Vec<i64>`, `chunk_lens: Vec<u32>`, `num_records: i64`,
//! `chunk_records: Vec<u64>`. `chunk_lens` holds each chunk's stored payload
//! size in bytes, excluding the header.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bincode::config::{self, Config};
use serde::{Deserialize, Serialize};

use crate::error::{RecordIoError, Result};
use crate::io::HeaderDecoder;
use crate::io::chunk::ChunkCodec;
use crate::types::{HeaderRead, RecordLocation};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexLayout", into = "IndexLayout")]
pub struct Index {
    chunk_offsets: Vec<i64>,
    chunk_lens: Vec<u32>,
    num_records: u64,
    chunk_records: Vec<u64>,
    /// `cumulative[i]` is the number of records in chunks `0..=i`.
    cumulative: Vec<u64>,
}

/// Serialized field order. Must not change.
#[derive(Serialize, Deserialize)]
struct IndexLayout {
    chunk_offsets: Vec<i64>,
    chunk_lens: Vec<u32>,
    num_records: i64,
    chunk_records: Vec<u64>,
}

impl From<Index> for IndexLayout {
    fn from(index: Index) -> Self {
        Self {
            chunk_offsets: index.chunk_offsets,
            chunk_lens: index.chunk_lens,
            // Unreachable past i64::MAX; a saturated total fails the reload check.
            num_records: i64::try_from(index.num_records).unwrap_or(i64::MAX),
            chunk_records: index.chunk_records,
        }
    }
}

impl TryFrom<IndexLayout> for Index {
    type Error = RecordIoError;

    fn try_from(layout: IndexLayout) -> Result<Self> {
        let chunks = layout.chunk_offsets.len();
        if layout.chunk_lens.len() != chunks || layout.chunk_records.len() != chunks {
            return Err(RecordIoError::IndexDecode {
                reason: format!(
                    "per-chunk field lengths differ: {} offsets, {} lens, {} record counts",
                    chunks,
                    layout.chunk_lens.len(),
                    layout.chunk_records.len()
                ),
            });
        }
        if layout.chunk_offsets.first().is_some_and(|&offset| offset < 0)
            || layout.chunk_offsets.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(RecordIoError::IndexDecode {
                reason: "chunk offsets must be non-negative and strictly increasing".into(),
            });
        }

        let cumulative = cumulative_counts(&layout.chunk_records).ok_or_else(|| {
            RecordIoError::IndexDecode {
                reason: "record count overflow".into(),
            }
        })?;
        let num_records =
            u64::try_from(layout.num_records).map_err(|_| RecordIoError::IndexDecode {
                reason: format!("negative num_records {}", layout.num_records),
            })?;
        let total = cumulative.last().copied().unwrap_or(0);
        if total != num_records {
            return Err(RecordIoError::IndexDecode {
                reason: format!(
                    "num_records is {} but chunks hold {total}",
                    layout.num_records
                ),
            });
        }

        Ok(Self {
            chunk_offsets: layout.chunk_offsets,
            chunk_lens: layout.chunk_lens,
            num_records,
            chunk_records: layout.chunk_records,
            cumulative,
        })
    }
}

fn cumulative_counts(chunk_records: &[u64]) -> Option<Vec<u64>> {
    let mut running = 0u64;
    chunk_records
        .iter()
        .map(|&count| {
            running = running.checked_add(count)?;
            Some(running)
        })
        .collect()
}

fn index_config() -> impl Config {
    config::standard()
        .with_fixed_int_encoding()
        .with_little_endian()
}

impl Index {
    /// Index every chunk from the current stream position to the end of the
    /// stream using the built-in codec.
    pub fn build<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Self::build_with(reader, &ChunkCodec::default())
    }

    /// Index with a caller-supplied header decoder.
    ///
    /// All-or-nothing: any decode or seek failure discards the chunks gathered
    /// so far and is returned to the caller. A stream with no chunks yields an
    /// empty index.
    pub fn build_with<R, D>(reader: &mut R, decoder: &D) -> Result<Self>
    where
        R: Read + Seek,
        D: HeaderDecoder + ?Sized,
    {
        let mut index = Self::default();
        let mut offset = reader.stream_position()?;

        loop {
            let header = match decoder.read_header(reader)? {
                HeaderRead::Header(header) => header,
                HeaderRead::EndOfStream => break,
            };
            let chunk_offset = i64::try_from(offset).map_err(|_| RecordIoError::InvalidHeader {
                offset,
                reason: "chunk offset does not fit in i64".into(),
            })?;

            index.chunk_offsets.push(chunk_offset);
            index.chunk_lens.push(header.compressed_size);
            index.chunk_records.push(u64::from(header.num_records));
            index.num_records += u64::from(header.num_records);
            index.cumulative.push(index.num_records);

            tracing::debug!(
                index.chunk = index.chunk_offsets.len() - 1,
                chunk.offset = offset,
                chunk.records = header.num_records,
                chunk.compressed_size = header.compressed_size,
                "indexed chunk"
            );

            let next = reader.seek(SeekFrom::Current(i64::from(header.compressed_size)))?;
            if next <= offset {
                return Err(RecordIoError::InvalidHeader {
                    offset,
                    reason: "header decoder did not advance the stream".into(),
                });
            }
            offset = next;
        }

        tracing::debug!(
            index.chunks = index.num_chunks(),
            index.records = index.num_records,
            "index built"
        );
        Ok(index)
    }

    /// Open `path` and index it from the start.
    pub fn build_from_path(path: impl AsRef<Path>) -> Result<Self> {
        // Unbuffered: every header read follows a seek.
        let mut file = fs_err::File::open(path.as_ref())?;
        Self::build(&mut file)
    }

    #[must_use]
    pub fn num_chunks(&self) -> usize {
        self.chunk_offsets.len()
    }

    #[must_use]
    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    #[must_use]
    pub fn chunk_offsets(&self) -> &[i64] {
        &self.chunk_offsets
    }

    #[must_use]
    pub fn chunk_lens(&self) -> &[u32] {
        &self.chunk_lens
    }

    #[must_use]
    pub fn chunk_records(&self) -> &[u64] {
        &self.chunk_records
    }

    #[must_use]
    pub fn chunk_offset(&self, ordinal: usize) -> Option<i64> {
        self.chunk_offsets.get(ordinal).copied()
    }

    /// Index holding only chunk `ordinal`, with `num_records` set to that
    /// chunk's record count.
    pub fn sub_index(&self, ordinal: usize) -> Result<Self> {
        let out_of_range = || RecordIoError::ChunkOutOfRange {
            ordinal,
            num_chunks: self.num_chunks(),
        };
        let offset = self.chunk_offsets.get(ordinal).copied().ok_or_else(out_of_range)?;
        let len = self.chunk_lens.get(ordinal).copied().ok_or_else(out_of_range)?;
        let records = self.chunk_records.get(ordinal).copied().ok_or_else(out_of_range)?;

        Ok(Self {
            chunk_offsets: vec![offset],
            chunk_lens: vec![len],
            num_records: records,
            chunk_records: vec![records],
            cumulative: vec![records],
        })
    }

    /// Resolve a global record number to its chunk and position within it.
    /// Returns `None` past the last record.
    #[must_use]
    pub fn locate(&self, record: u64) -> Option<RecordLocation> {
        if record >= self.num_records {
            return None;
        }
        // First chunk whose cumulative count exceeds `record`; empty chunks are
        // skipped because their cumulative count equals their predecessor's.
        let chunk = self.cumulative.partition_point(|&total| total <= record);
        let before = match chunk.checked_sub(1) {
            Some(prev) => *self.cumulative.get(prev)?,
            None => 0,
        };
        let local = usize::try_from(record - before).ok()?;
        Some(RecordLocation { chunk, local })
    }

    /// Serialize the index, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let written = bincode::serde::encode_into_std_write(self, writer, index_config())?;
        log::debug!(
            "persisted index: {} chunks, {} records, {written} bytes",
            self.num_chunks(),
            self.num_records
        );
        Ok(written)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let index: Self = bincode::serde::decode_from_std_read(reader, index_config())?;
        log::debug!(
            "loaded index: {} chunks, {} records",
            index.num_chunks(),
            index.num_records
        );
        Ok(index)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, index_config())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (index, _) = bincode::serde::decode_from_slice(bytes, index_config())?;
        Ok(index)
    }
}
