//! Fixed-width chunk header codec.

use std::io::{ErrorKind, Read, Seek, Write};

use crate::constants::{CHUNK_HEADER_SIZE, CHUNK_MAGIC};
use crate::error::{RecordIoError, Result};
use crate::types::{ChunkHeader, Compression, HeaderRead};

pub struct HeaderCodec;

impl HeaderCodec {
    /// Read one header at the current position.
    ///
    /// Returns [`HeaderRead::EndOfStream`] only when no bytes remain; a header cut
    /// short mid-encoding is reported as [`RecordIoError::InvalidHeader`].
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<HeaderRead> {
        let offset = reader.stream_position()?;
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        let filled = read_full(reader, &mut buf)?;
        if filled == 0 {
            return Ok(HeaderRead::EndOfStream);
        }
        if filled < CHUNK_HEADER_SIZE {
            return Err(RecordIoError::InvalidHeader {
                offset,
                reason: format!("header truncated after {filled} of {CHUNK_HEADER_SIZE} bytes"),
            });
        }
        Self::decode(&buf, offset).map(HeaderRead::Header)
    }

    pub fn write<W: Write>(writer: &mut W, header: &ChunkHeader) -> Result<()> {
        writer.write_all(&Self::encode(header))?;
        Ok(())
    }

    #[must_use]
    pub fn encode(header: &ChunkHeader) -> [u8; CHUNK_HEADER_SIZE] {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        buf[..4].copy_from_slice(&CHUNK_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&header.num_records.to_le_bytes());
        buf[8..12].copy_from_slice(&header.compressed_size.to_le_bytes());
        buf[12] = header.compression.to_byte();
        buf[16..48].copy_from_slice(&header.checksum);
        buf
    }

    /// `offset` is only used to label errors.
    pub fn decode(buf: &[u8; CHUNK_HEADER_SIZE], offset: u64) -> Result<ChunkHeader> {
        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != CHUNK_MAGIC {
            return Err(RecordIoError::InvalidHeader {
                offset,
                reason: format!("bad magic {magic:#010x}"),
            });
        }
        let num_records = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let compressed_size = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let compression =
            Compression::from_byte(buf[12]).ok_or_else(|| RecordIoError::InvalidHeader {
                offset,
                reason: format!("unknown compressor {}", buf[12]),
            })?;
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&buf[16..48]);

        Ok(ChunkHeader {
            num_records,
            compressed_size,
            compression,
            checksum,
        })
    }
}

/// Fill `buf` as far as the stream allows, returning the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
