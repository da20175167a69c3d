//! Builder-style options used when writing and reading chunked record files.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_CHUNK_BYTES, DEFAULT_MAX_RECORD_BYTES, DEFAULT_MAX_RECORDS_PER_CHUNK,
    DEFAULT_READ_LIMIT_BYTES, DEFAULT_ZSTD_LEVEL,
};
use crate::constants::RECORD_LEN_PREFIX;
use crate::error::{RecordIoError, Result};

fn default_true() -> bool {
    true
}

/// Payload compressor recorded in each chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Zstd,
    Lz4,
}

impl Compression {
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
            Self::Lz4 => 2,
        }
    }

    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            2 => Some(Self::Lz4),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zstd => "zstd",
            Self::Lz4 => "lz4",
        }
    }
}

/// Tunable options for [`ChunkWriter`](crate::ChunkWriter).
///
/// A chunk is emitted as soon as either limit is reached, so a single record
/// larger than `max_chunk_bytes` still lands in a chunk of its own. Validation
/// keeps every chunk the writer can produce within the default
/// [`ReadOptions::max_chunk_bytes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterOptions {
    #[serde(default = "default_max_records")]
    pub max_records_per_chunk: u32,
    /// Uncompressed record bytes (including length prefixes) per chunk.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
    /// Largest single record, length prefix included.
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: usize,
    #[serde(default)]
    pub compression: Compression,
    #[serde(default = "default_zstd_level")]
    pub zstd_level: i32,
}

fn default_max_records() -> u32 {
    DEFAULT_MAX_RECORDS_PER_CHUNK
}

fn default_max_chunk_bytes() -> usize {
    DEFAULT_MAX_CHUNK_BYTES
}

fn default_max_record_bytes() -> usize {
    DEFAULT_MAX_RECORD_BYTES
}

fn default_zstd_level() -> i32 {
    DEFAULT_ZSTD_LEVEL
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            max_records_per_chunk: default_max_records(),
            max_chunk_bytes: default_max_chunk_bytes(),
            max_record_bytes: default_max_record_bytes(),
            compression: Compression::default(),
            zstd_level: default_zstd_level(),
        }
    }
}

impl WriterOptions {
    /// Start a fluent builder for `WriterOptions`.
    #[must_use]
    pub fn builder() -> WriterOptionsBuilder {
        WriterOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_records_per_chunk == 0 {
            return Err(RecordIoError::InvalidOptions {
                reason: "max_records_per_chunk must be non-zero".into(),
            });
        }
        if self.max_chunk_bytes == 0 {
            return Err(RecordIoError::InvalidOptions {
                reason: "max_chunk_bytes must be non-zero".into(),
            });
        }
        if self.max_record_bytes <= RECORD_LEN_PREFIX {
            return Err(RecordIoError::InvalidOptions {
                reason: format!("max_record_bytes must exceed {RECORD_LEN_PREFIX}"),
            });
        }
        // A chunk is flushed once it reaches max_chunk_bytes, so it holds at
        // most max_chunk_bytes + max_record_bytes framed bytes. Half the read
        // limit covers zstd and lz4 expansion of incompressible payloads.
        let worst_chunk = self.max_chunk_bytes.saturating_add(self.max_record_bytes);
        if worst_chunk > DEFAULT_READ_LIMIT_BYTES / 2 {
            return Err(RecordIoError::InvalidOptions {
                reason: format!(
                    "max_chunk_bytes + max_record_bytes ({worst_chunk}) exceeds {}",
                    DEFAULT_READ_LIMIT_BYTES / 2
                ),
            });
        }
        if self.compression == Compression::Zstd
            && !zstd::compression_level_range().contains(&self.zstd_level)
        {
            return Err(RecordIoError::InvalidOptions {
                reason: format!("zstd level {} out of range", self.zstd_level),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriterOptionsBuilder {
    inner: WriterOptions,
}

impl WriterOptionsBuilder {
    #[must_use]
    pub fn max_records_per_chunk(mut self, records: u32) -> Self {
        self.inner.max_records_per_chunk = records;
        self
    }

    #[must_use]
    pub fn max_chunk_bytes(mut self, bytes: usize) -> Self {
        self.inner.max_chunk_bytes = bytes;
        self
    }

    #[must_use]
    pub fn max_record_bytes(mut self, bytes: usize) -> Self {
        self.inner.max_record_bytes = bytes;
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.inner.compression = compression;
        self
    }

    #[must_use]
    pub fn zstd_level(mut self, level: i32) -> Self {
        self.inner.zstd_level = level;
        self
    }

    #[must_use]
    pub fn build(self) -> WriterOptions {
        self.inner
    }
}

/// Options applied by [`ChunkCodec`](crate::io::chunk::ChunkCodec) when decoding chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
    /// Largest compressed or decompressed payload accepted before the chunk is
    /// rejected as corrupt.
    #[serde(default = "default_read_limit")]
    pub max_chunk_bytes: usize,
}

fn default_read_limit() -> usize {
    DEFAULT_READ_LIMIT_BYTES
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            max_chunk_bytes: default_read_limit(),
        }
    }
}

impl ReadOptions {
    #[must_use]
    pub fn builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptionsBuilder {
    inner: ReadOptions,
}

impl ReadOptionsBuilder {
    #[must_use]
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.inner.verify_checksum = verify;
        self
    }

    #[must_use]
    pub fn max_chunk_bytes(mut self, bytes: usize) -> Self {
        self.inner.max_chunk_bytes = bytes;
        self
    }

    #[must_use]
    pub fn build(self) -> ReadOptions {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_byte_mapping_is_stable() {
        for compression in [Compression::None, Compression::Zstd, Compression::Lz4] {
            assert_eq!(Compression::from_byte(compression.to_byte()), Some(compression));
        }
        assert_eq!(Compression::from_byte(7), None);
    }

    #[test]
    fn builder_overrides_defaults() {
        let opts = WriterOptions::builder()
            .max_records_per_chunk(3)
            .compression(Compression::Lz4)
            .build();
        assert_eq!(opts.max_records_per_chunk, 3);
        assert_eq!(opts.compression, Compression::Lz4);
        assert_eq!(opts.max_chunk_bytes, DEFAULT_MAX_CHUNK_BYTES);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = WriterOptions::builder()
            .max_records_per_chunk(0)
            .build()
            .validate()
            .expect_err("zero records per chunk");
        assert!(matches!(err, RecordIoError::InvalidOptions { .. }));

        let err = WriterOptions::builder()
            .max_chunk_bytes(0)
            .build()
            .validate()
            .expect_err("zero chunk bytes");
        assert!(matches!(err, RecordIoError::InvalidOptions { .. }));

        let err = WriterOptions::builder()
            .max_record_bytes(RECORD_LEN_PREFIX)
            .build()
            .validate()
            .expect_err("record limit without room for a payload");
        assert!(matches!(err, RecordIoError::InvalidOptions { .. }));
    }

    #[test]
    fn chunks_must_fit_the_default_read_limit() {
        assert!(WriterOptions::default().validate().is_ok());

        let err = WriterOptions::builder()
            .max_chunk_bytes(DEFAULT_READ_LIMIT_BYTES)
            .build()
            .validate()
            .expect_err("chunk limit at the read limit");
        assert!(matches!(err, RecordIoError::InvalidOptions { .. }));

        let err = WriterOptions::builder()
            .max_record_bytes(DEFAULT_READ_LIMIT_BYTES + 1)
            .build()
            .validate()
            .expect_err("record limit above the read limit");
        assert!(matches!(err, RecordIoError::InvalidOptions { .. }));

        let edge = WriterOptions::builder()
            .max_chunk_bytes(DEFAULT_READ_LIMIT_BYTES / 4)
            .max_record_bytes(DEFAULT_READ_LIMIT_BYTES / 4)
            .build();
        assert!(edge.validate().is_ok());
    }
}
