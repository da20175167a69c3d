//! Public types exposed by the `recordio-core` crate.

pub mod chunk;
pub mod options;

pub use chunk::{Chunk, ChunkHeader, HeaderRead, RecordLocation};
pub use options::{
    Compression, ReadOptions, ReadOptionsBuilder, WriterOptions, WriterOptionsBuilder,
};
