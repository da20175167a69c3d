//! Error types surfaced by index construction, chunk decoding and range scans.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RecordIoError>;

#[derive(Debug, Error)]
pub enum RecordIoError {
    /// Read or seek failure on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunk header at offset {offset}: {reason}")]
    InvalidHeader { offset: u64, reason: String },

    #[error("invalid chunk at offset {offset}: {reason}")]
    InvalidChunk { offset: u64, reason: String },

    /// The stream ended, or a chunk held fewer records than indexed, before the
    /// requested range was exhausted.
    #[error("stream truncated at offset {offset}: {reason}")]
    Truncated { offset: u64, reason: String },

    #[error("chunk ordinal {ordinal} out of range ({num_chunks} chunks)")]
    ChunkOutOfRange { ordinal: usize, num_chunks: usize },

    #[error("no current record; advance() has not reported an available record")]
    NoCurrentRecord,

    #[error("failed to encode index: {0}")]
    IndexEncode(#[from] bincode::error::EncodeError),

    #[error("failed to decode index: {reason}")]
    IndexDecode { reason: String },

    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },
}

impl From<bincode::error::DecodeError> for RecordIoError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::IndexDecode {
            reason: err.to_string(),
        }
    }
}

impl RecordIoError {
    /// True when the error reports data damage rather than an I/O or caller fault.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader { .. } | Self::InvalidChunk { .. } | Self::Truncated { .. }
        )
    }
}
