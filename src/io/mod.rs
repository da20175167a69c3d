//! Chunk codec and the decoder seams used by indexing and scanning.
//!
//! Index construction only needs a [`HeaderDecoder`]; range scans need a
//! [`ChunkDecoder`]. [`chunk::ChunkCodec`] implements both for the built-in
//! on-disk format, and callers may substitute their own implementations.

pub mod chunk;
pub mod header;
pub mod writer;

use std::io::{Read, Seek};

use crate::error::Result;
use crate::types::{Chunk, HeaderRead};

pub trait HeaderDecoder {
    /// Decode the header at the current stream position, consuming exactly the
    /// header bytes. Must report [`HeaderRead::EndOfStream`] when the stream is
    /// exhausted at a header boundary.
    fn read_header<R: Read + Seek>(&self, reader: &mut R) -> Result<HeaderRead>;
}

pub trait ChunkDecoder {
    /// Read and decode the whole chunk starting at `offset`, returning its
    /// records in on-disk order.
    fn decode_chunk<R: Read + Seek>(&self, reader: &mut R, offset: u64) -> Result<Chunk>;
}

impl<D: HeaderDecoder + ?Sized> HeaderDecoder for &D {
    fn read_header<R: Read + Seek>(&self, reader: &mut R) -> Result<HeaderRead> {
        (**self).read_header(reader)
    }
}

impl<D: ChunkDecoder + ?Sized> ChunkDecoder for &D {
    fn decode_chunk<R: Read + Seek>(&self, reader: &mut R, offset: u64) -> Result<Chunk> {
        (**self).decode_chunk(reader, offset)
    }
}
