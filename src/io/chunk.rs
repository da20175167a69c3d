//! Built-in chunk codec: record framing, compression and checksums.
//!
//! A chunk on disk is a [`HeaderCodec`] header followed by `compressed_size`
//! payload bytes. The uncompressed payload is a run of `[len: u32][bytes]`
//! records; the header checksum is the blake3 digest of the stored payload.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use super::header::HeaderCodec;
use super::{ChunkDecoder, HeaderDecoder};
use crate::constants::{CHUNK_HEADER_SIZE, RECORD_LEN_PREFIX};
use crate::error::{RecordIoError, Result};
use crate::types::{Chunk, ChunkHeader, Compression, HeaderRead, ReadOptions};

#[derive(Debug, Clone, Default)]
pub struct ChunkCodec {
    options: ReadOptions,
}

impl ChunkCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ReadOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Encode `records` into one complete chunk (header followed by payload).
    pub fn encode<T: AsRef<[u8]>>(
        records: &[T],
        compression: Compression,
        zstd_level: i32,
    ) -> Result<Vec<u8>> {
        let num_records = u32::try_from(records.len()).map_err(|_| {
            RecordIoError::InvalidOptions {
                reason: format!("{} records exceed the per-chunk limit", records.len()),
            }
        })?;

        let framed_len: usize = records
            .iter()
            .map(|record| RECORD_LEN_PREFIX + record.as_ref().len())
            .sum();
        let mut framed = Vec::with_capacity(framed_len);
        for record in records {
            let record = record.as_ref();
            let len = u32::try_from(record.len()).map_err(|_| RecordIoError::InvalidOptions {
                reason: format!("record of {} bytes is too large", record.len()),
            })?;
            framed.extend_from_slice(&len.to_le_bytes());
            framed.extend_from_slice(record);
        }

        let payload = match compression {
            Compression::None => framed,
            Compression::Zstd => zstd::bulk::compress(&framed, zstd_level)?,
            Compression::Lz4 => lz4_flex::compress_prepend_size(&framed),
        };
        let compressed_size =
            u32::try_from(payload.len()).map_err(|_| RecordIoError::InvalidOptions {
                reason: format!("chunk payload of {} bytes is too large", payload.len()),
            })?;

        let header = ChunkHeader {
            num_records,
            compressed_size,
            compression,
            checksum: *blake3::hash(&payload).as_bytes(),
        };

        let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
        out.extend_from_slice(&HeaderCodec::encode(&header));
        out.extend_from_slice(&payload);
        Ok(out)
    }

    fn read_payload<R: Read>(
        &self,
        reader: &mut R,
        header: &ChunkHeader,
        offset: u64,
    ) -> Result<Vec<u8>> {
        let size = header.compressed_size as usize;
        if size > self.options.max_chunk_bytes {
            return Err(RecordIoError::InvalidChunk {
                offset,
                reason: format!(
                    "payload of {size} bytes exceeds limit of {}",
                    self.options.max_chunk_bytes
                ),
            });
        }
        let mut payload = Vec::with_capacity(size);
        reader
            .by_ref()
            .take(u64::from(header.compressed_size))
            .read_to_end(&mut payload)?;
        if payload.len() < size {
            return Err(RecordIoError::Truncated {
                offset,
                reason: format!("payload ends after {} of {size} bytes", payload.len()),
            });
        }

        if self.options.verify_checksum && blake3::hash(&payload).as_bytes() != &header.checksum
        {
            tracing::error!(chunk.offset = offset, "chunk checksum mismatch");
            return Err(RecordIoError::InvalidChunk {
                offset,
                reason: "checksum mismatch".into(),
            });
        }
        Ok(payload)
    }

    fn decompress(
        &self,
        payload: Vec<u8>,
        compression: Compression,
        offset: u64,
    ) -> Result<Vec<u8>> {
        let limit = self.options.max_chunk_bytes;
        match compression {
            Compression::None => Ok(payload),
            Compression::Zstd => {
                zstd::bulk::decompress(&payload, limit).map_err(|err| RecordIoError::InvalidChunk {
                    offset,
                    reason: format!("zstd: {err}"),
                })
            }
            Compression::Lz4 => {
                let (prefix, body) = payload.split_at_checked(4).ok_or_else(|| {
                    RecordIoError::InvalidChunk {
                        offset,
                        reason: "lz4 payload missing size prefix".into(),
                    }
                })?;
                let expected =
                    u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
                if expected > limit {
                    return Err(RecordIoError::InvalidChunk {
                        offset,
                        reason: format!("lz4 payload declares {expected} bytes, limit is {limit}"),
                    });
                }
                let out = lz4_flex::decompress(body, expected).map_err(|err| {
                    RecordIoError::InvalidChunk {
                        offset,
                        reason: format!("lz4: {err}"),
                    }
                })?;
                if out.len() != expected {
                    return Err(RecordIoError::InvalidChunk {
                        offset,
                        reason: format!("lz4 produced {} of {expected} bytes", out.len()),
                    });
                }
                Ok(out)
            }
        }
    }
}

/// Split a framed payload into records, checking the count the header declared.
fn split_records(framed: &[u8], expected: u32, offset: u64) -> Result<Vec<Vec<u8>>> {
    let capacity = (expected as usize).min(framed.len() / RECORD_LEN_PREFIX);
    let mut records = Vec::with_capacity(capacity);
    let mut rest = framed;
    while !rest.is_empty() {
        let (prefix, tail) = rest.split_at_checked(RECORD_LEN_PREFIX).ok_or_else(|| {
            RecordIoError::InvalidChunk {
                offset,
                reason: format!("dangling {} bytes after record {}", rest.len(), records.len()),
            }
        })?;
        let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let (record, tail) = tail.split_at_checked(len).ok_or_else(|| {
            RecordIoError::InvalidChunk {
                offset,
                reason: format!(
                    "record {} declares {len} bytes, {} remain",
                    records.len(),
                    tail.len()
                ),
            }
        })?;
        records.push(record.to_vec());
        rest = tail;
    }

    if records.len() != expected as usize {
        return Err(RecordIoError::InvalidChunk {
            offset,
            reason: format!(
                "header declares {expected} records, payload holds {}",
                records.len()
            ),
        });
    }
    Ok(records)
}

impl HeaderDecoder for ChunkCodec {
    fn read_header<R: Read + Seek>(&self, reader: &mut R) -> Result<HeaderRead> {
        HeaderCodec::read(reader)
    }
}

impl ChunkDecoder for ChunkCodec {
    fn decode_chunk<R: Read + Seek>(&self, reader: &mut R, offset: u64) -> Result<Chunk> {
        reader.seek(SeekFrom::Start(offset))?;
        let header = match HeaderCodec::read(reader)? {
            HeaderRead::Header(header) => header,
            HeaderRead::EndOfStream => {
                return Err(RecordIoError::Truncated {
                    offset,
                    reason: "no chunk header at indexed offset".into(),
                });
            }
        };
        let payload = self.read_payload(reader, &header, offset)?;
        let framed = self.decompress(payload, header.compression, offset)?;
        let records = split_records(&framed, header.num_records, offset)?;

        tracing::debug!(
            chunk.offset = offset,
            chunk.records = header.num_records,
            chunk.compressed_size = header.compressed_size,
            chunk.compression = header.compression.label(),
            "decoded chunk"
        );
        Ok(Chunk::new(records))
    }
}

/// Map a bare end-of-file from a decoder into a truncation at `offset`.
pub(crate) fn truncation_from_eof(err: RecordIoError, offset: u64) -> RecordIoError {
    match err {
        RecordIoError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
            RecordIoError::Truncated {
                offset,
                reason: io.to_string(),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn records() -> Vec<Vec<u8>> {
        vec![b"alpha".to_vec(), Vec::new(), vec![0xEE; 300], b"omega".to_vec()]
    }

    #[test]
    fn decodes_every_compression() {
        for compression in [Compression::None, Compression::Zstd, Compression::Lz4] {
            let bytes = ChunkCodec::encode(&records(), compression, 3).expect("encode");
            let mut cursor = Cursor::new(bytes);
            let chunk = ChunkCodec::new()
                .decode_chunk(&mut cursor, 0)
                .expect("decode");
            assert_eq!(chunk.records(), records().as_slice(), "{}", compression.label());
        }
    }

    #[test]
    fn decodes_at_non_zero_offset() {
        let mut bytes = ChunkCodec::encode(&[b"first"], Compression::None, 0).expect("encode");
        let second_at = bytes.len() as u64;
        let second: [&[u8]; 2] = [b"second", b"third"];
        bytes.extend(ChunkCodec::encode(&second, Compression::Zstd, 3).expect("encode"));

        let chunk = ChunkCodec::new()
            .decode_chunk(&mut Cursor::new(bytes), second_at)
            .expect("decode");
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.record(1), Some(&b"third"[..]));
    }

    #[test]
    fn checksum_mismatch_is_invalid_chunk() {
        let mut bytes = ChunkCodec::encode(&records(), Compression::None, 0).expect("encode");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let err = ChunkCodec::new()
            .decode_chunk(&mut Cursor::new(bytes.clone()), 0)
            .expect_err("corrupt payload");
        assert!(matches!(err, RecordIoError::InvalidChunk { offset: 0, .. }));

        // Without verification the flipped byte only alters record content.
        let lenient =
            ChunkCodec::with_options(ReadOptions::builder().verify_checksum(false).build());
        let chunk = lenient
            .decode_chunk(&mut Cursor::new(bytes), 0)
            .expect("decode without checksum");
        assert_eq!(chunk.len(), 4);
        assert_ne!(chunk.record(3), Some(&b"omega"[..]));
    }

    #[test]
    fn short_payload_is_truncation() {
        let bytes = ChunkCodec::encode(&records(), Compression::None, 0).expect("encode");
        let cut = bytes[..bytes.len() - 10].to_vec();
        let err = ChunkCodec::new()
            .decode_chunk(&mut Cursor::new(cut), 0)
            .expect_err("truncated payload");
        assert!(matches!(err, RecordIoError::Truncated { offset: 0, .. }));
    }

    #[test]
    fn missing_chunk_is_truncation() {
        let bytes = ChunkCodec::encode(&records(), Compression::Lz4, 0).expect("encode");
        let end = bytes.len() as u64;
        let err = ChunkCodec::new()
            .decode_chunk(&mut Cursor::new(bytes), end)
            .expect_err("nothing at end");
        assert!(err.is_corruption());
    }

    #[test]
    fn oversized_payload_is_rejected_before_reading() {
        let bytes = ChunkCodec::encode(&[vec![1u8; 4096]], Compression::None, 0).expect("encode");
        let strict = ChunkCodec::with_options(ReadOptions::builder().max_chunk_bytes(1024).build());
        let err = strict
            .decode_chunk(&mut Cursor::new(bytes), 0)
            .expect_err("limit exceeded");
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn record_count_mismatch_is_detected() {
        let framed = {
            let mut buf = Vec::new();
            buf.extend_from_slice(&3u32.to_le_bytes());
            buf.extend_from_slice(b"abc");
            buf
        };
        let err = split_records(&framed, 2, 48).expect_err("count mismatch");
        assert!(err.to_string().contains("declares 2 records"));

        let err = split_records(&framed[..5], 1, 48).expect_err("short record");
        assert!(matches!(err, RecordIoError::InvalidChunk { offset: 48, .. }));
    }

    #[test]
    fn unexpected_eof_maps_to_truncation() {
        let io = std::io::Error::new(ErrorKind::UnexpectedEof, "eof");
        let mapped = truncation_from_eof(RecordIoError::Io(io), 128);
        assert!(matches!(mapped, RecordIoError::Truncated { offset: 128, .. }));

        let other = std::io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            truncation_from_eof(RecordIoError::Io(other), 0),
            RecordIoError::Io(_)
        ));
    }
}
