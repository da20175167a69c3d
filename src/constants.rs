//! On-disk constants for the chunk format.

/// Magic value opening every chunk header.
pub const CHUNK_MAGIC: u32 = 0x0102_0304;

// Chunk header: [magic: u32][num_records: u32][compressed_size: u32]
//               [compressor: u8][reserved: 3 bytes][checksum: 32 bytes]
pub const CHUNK_HEADER_SIZE: usize = 48;

/// Width of the little-endian length prefix framing each record in a payload.
pub const RECORD_LEN_PREFIX: usize = 4;

pub const DEFAULT_MAX_RECORDS_PER_CHUNK: u32 = 1_000;
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 1024 * 1024;
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;
/// Largest framed record (length prefix included) the writer accepts by default.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 16 * 1024 * 1024;

/// Upper bound on a decoded chunk payload accepted by the reader.
pub const DEFAULT_READ_LIMIT_BYTES: usize = 64 * 1024 * 1024;
