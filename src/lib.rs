#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(clippy::uninlined_format_args, clippy::items_after_statements)
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: error and panic sections are omitted on self-describing APIs.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: offsets and counts are bounded by the u32 header fields and by
// i64 stream positions, so plain casts between them are exact.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
//
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't need must_use on every method
#![allow(clippy::len_without_is_empty)]

//! Chunked record files with header-only indexing and lazy range scanning.
//!
//! A file is a sequence of self-contained chunks, each a fixed header followed
//! by a (possibly compressed) batch of records. [`Index::build`] reads only the
//! headers to learn where every chunk lives; [`RangeScanner`] then walks any
//! contiguous record range, decoding one chunk at a time.
//!
//! ```no_run
//! use std::fs::File;
//! use recordio_core::{Index, RangeScanner};
//!
//! # fn main() -> recordio_core::Result<()> {
//! let index = Index::build(&mut File::open("events.rio")?)?;
//! let mut scanner = RangeScanner::new(File::open("events.rio")?, &index, 100, 50);
//! while scanner.advance() {
//!     let record = scanner.record()?;
//!     println!("{} bytes", record.len());
//! }
//! if let Some(err) = scanner.into_error() {
//!     return Err(err);
//! }
//! # Ok(())
//! # }
//! ```

/// The recordio-core crate version (matches `Cargo.toml`).
pub const RECORDIO_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod error;
pub mod index;
pub mod io;
pub mod scanner;
pub mod types;

pub use constants::*;
pub use error::{RecordIoError, Result};
pub use index::Index;
pub use io::chunk::ChunkCodec;
pub use io::header::HeaderCodec;
pub use io::writer::{ChunkWriter, WriterStats};
pub use io::{ChunkDecoder, HeaderDecoder};
pub use scanner::{RangeScanner, ScanState};
pub use types::{
    Chunk, ChunkHeader, Compression, HeaderRead, ReadOptions, ReadOptionsBuilder, RecordLocation,
    WriterOptions, WriterOptionsBuilder,
};
