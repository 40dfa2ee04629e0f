//! Append-only content store for blob payloads.
//!
//! Two encodings share the same `put`/`get` contract:
//!
//! - **Unaligned**: `[id:128][size:8 LE][payload]`, variable length.
//! - **Block-aligned**: the payload is split into fixed-size chunks, each
//!   serialized as `[id:128][remaining:8 LE][checksum:32][content]` and
//!   rounded to a 4 KiB boundary, so a random read is served by reading
//!   whole chunks from `offset` without a seek table. The size field holds
//!   the payload bytes remaining from that chunk onward, so the first chunk
//!   carries the total length.
//!
//! Checksums are computed per chunk but reads are reconciled by blob-id
//! equality only; an id mismatch between the request and the record on disk
//! is corruption, never silently ignored.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use blobcache_types::{BlobId, ShardId, UnitId};

use crate::error::{LogError, LogResult};
use crate::layout;

pub const BLOB_ID_FIELD: usize = 128;
pub const SIZE_FIELD: usize = 8;
pub const CHECKSUM_FIELD: usize = 32;
pub const BLOCK_SIZE: usize = 4 * 1024;
/// Payload bytes per aligned chunk once the chunk header is accounted for.
pub const CHUNK_CONTENT_SIZE: usize = BLOCK_SIZE - BLOB_ID_FIELD - SIZE_FIELD - CHECKSUM_FIELD;
/// Unaligned record header: id field plus size field.
pub const UNALIGNED_HEADER: usize = BLOB_ID_FIELD + SIZE_FIELD;

/// Physical record encoding of a binary log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Unaligned,
    BlockAligned,
}

impl Encoding {
    /// Exact on-disk footprint of a payload of `data_len` bytes. This is the
    /// quantity the holder reserves against the global byte budget.
    pub fn payload_size(&self, data_len: usize) -> u64 {
        match self {
            Self::Unaligned => (UNALIGNED_HEADER + data_len) as u64,
            Self::BlockAligned => {
                let chunks = data_len.div_ceil(CHUNK_CONTENT_SIZE).max(1);
                (chunks * BLOCK_SIZE) as u64
            }
        }
    }
}

/// Append-only byte storage for one unit.
///
/// Writes take the exclusive half of the lock, reads the shared half, so
/// readers of one unit never block each other and never block other units.
pub struct BinaryLog {
    path: PathBuf,
    encoding: Encoding,
    /// Current append offset; equals the file length.
    offset: RwLock<u64>,
}

impl BinaryLog {
    /// Open or create the binary log for a unit. Returns the log and its
    /// current on-disk size.
    pub fn open(
        root: &Path,
        shard: ShardId,
        unit: &UnitId,
        encoding: Encoding,
    ) -> LogResult<(Self, u64)> {
        let path = layout::binary_path(root, shard, unit);
        let size = layout::file_size(&path)?;
        Ok((
            Self {
                path,
                encoding,
                offset: RwLock::new(size),
            },
            size,
        ))
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Current append offset (the file length).
    pub fn len(&self) -> u64 {
        *self.offset.read().expect("lock poisoned")
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one blob. Returns `(offset, bytes_written)`; once this returns
    /// success the bytes are durable and are never rolled back.
    pub fn put(&self, blob_id: &BlobId, data: &[u8]) -> LogResult<(u64, u64)> {
        let encoded = match self.encoding {
            Encoding::Unaligned => encode(blob_id, data)?,
            Encoding::BlockAligned => encode_aligned(blob_id, data)?,
        };

        let mut offset = self.offset.write().expect("lock poisoned");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&encoded)?;

        let record_offset = *offset;
        *offset += encoded.len() as u64;
        debug!(
            blob = %blob_id,
            offset = record_offset,
            written = encoded.len(),
            "binary log put"
        );
        Ok((record_offset, encoded.len() as u64))
    }

    /// Read the blob whose record starts at `offset`. The id embedded in the
    /// record must match `blob_id`; a mismatch is fatal corruption.
    pub fn get(&self, blob_id: &BlobId, offset: u64) -> LogResult<Vec<u8>> {
        let _shared = self.offset.read().expect("lock poisoned");
        let mut file = File::open(&self.path)?;
        let data = match self.encoding {
            Encoding::Unaligned => self.read_unaligned(&mut file, blob_id, offset)?,
            Encoding::BlockAligned => self.read_aligned(&mut file, blob_id, offset)?,
        };
        debug!(blob = %blob_id, offset, read = data.len(), "binary log get");
        Ok(data)
    }

    fn read_unaligned(&self, file: &mut File, blob_id: &BlobId, offset: u64) -> LogResult<Vec<u8>> {
        let mut header = [0u8; UNALIGNED_HEADER];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut header)?;

        self.check_id(blob_id, &header[..BLOB_ID_FIELD])?;
        let size = decode_size(&header[BLOB_ID_FIELD..UNALIGNED_HEADER]);

        let mut body = vec![0u8; size as usize];
        file.read_exact(&mut body)?;
        Ok(body)
    }

    fn read_aligned(&self, file: &mut File, blob_id: &BlobId, offset: u64) -> LogResult<Vec<u8>> {
        let mut header = [0u8; UNALIGNED_HEADER];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut header)?;

        self.check_id(blob_id, &header[..BLOB_ID_FIELD])?;
        let size = decode_size(&header[BLOB_ID_FIELD..UNALIGNED_HEADER]);

        let chunks = (size as usize).div_ceil(CHUNK_CONTENT_SIZE).max(1);
        let mut run = vec![0u8; chunks * BLOCK_SIZE];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut run)?;

        let mut body = Vec::with_capacity(size as usize);
        for chunk in run.chunks_exact(BLOCK_SIZE) {
            self.check_id(blob_id, &chunk[..BLOB_ID_FIELD])?;
            let content_start = BLOB_ID_FIELD + SIZE_FIELD + CHECKSUM_FIELD;
            body.extend_from_slice(&chunk[content_start..]);
        }
        body.truncate(size as usize);
        Ok(body)
    }

    fn check_id(&self, requested: &BlobId, id_field: &[u8]) -> LogResult<()> {
        let stored = decode_id(id_field);
        if stored != requested.as_str() {
            return Err(LogError::corrupt(
                &self.path,
                format!("blob id mismatch: stored {stored:?}, requested {requested}"),
            ));
        }
        Ok(())
    }
}

fn encode_id(blob_id: &BlobId) -> LogResult<[u8; BLOB_ID_FIELD]> {
    let bytes = blob_id.as_str().as_bytes();
    if bytes.len() > BLOB_ID_FIELD {
        return Err(LogError::BlobIdTooLong {
            len: bytes.len(),
            limit: BLOB_ID_FIELD,
        });
    }
    let mut field = [0u8; BLOB_ID_FIELD];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

fn decode_id(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn decode_size(field: &[u8]) -> u64 {
    let mut bytes = [0u8; SIZE_FIELD];
    bytes.copy_from_slice(field);
    u64::from_le_bytes(bytes)
}

/// `[id:128][size:8 LE][payload]`
fn encode(blob_id: &BlobId, data: &[u8]) -> LogResult<Vec<u8>> {
    let id = encode_id(blob_id)?;
    let mut out = Vec::with_capacity(UNALIGNED_HEADER + data.len());
    out.extend_from_slice(&id);
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

/// Fixed 4 KiB chunks. An empty payload still emits one chunk so that the
/// record remains addressable and zero-length blobs round-trip.
fn encode_aligned(blob_id: &BlobId, data: &[u8]) -> LogResult<Vec<u8>> {
    let id = encode_id(blob_id)?;
    let chunks = data.len().div_ceil(CHUNK_CONTENT_SIZE).max(1);
    let mut out = Vec::with_capacity(chunks * BLOCK_SIZE);

    for i in 0..chunks {
        let start = (i * CHUNK_CONTENT_SIZE).min(data.len());
        let end = ((i + 1) * CHUNK_CONTENT_SIZE).min(data.len());
        let content = &data[start..end];
        let remaining = (data.len() - start) as u64;

        out.extend_from_slice(&id);
        out.extend_from_slice(&remaining.to_le_bytes());

        let mut checksum = [0u8; CHECKSUM_FIELD];
        checksum[..4].copy_from_slice(&crc32fast::hash(content).to_le_bytes());
        out.extend_from_slice(&checksum);

        out.extend_from_slice(content);
        out.resize(out.len() + CHUNK_CONTENT_SIZE - content.len(), 0);
    }
    Ok(out)
}
