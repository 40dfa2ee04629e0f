//! Ordered catalogue of the blobs stored in one unit.
//!
//! The first byte of the file is the persisted unit state, followed by a
//! newline and a JSON array body of fixed-width records (see [`crate::record`]).
//! Entries are appended in write order and mirrored in an in-memory map for
//! O(1) retrieval. Deletion removes the in-memory entry only; physical space
//! is reclaimed by deleting the whole unit.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use blobcache_types::{BlobId, ShardId, UnitId};

use crate::error::{LogError, LogResult};
use crate::layout;
use crate::record::{append_record, padding_for};

/// Fixed record width, separator included.
pub const INDEX_RECORD_WIDTH: usize = 252;

/// Lifecycle state of a unit, persisted as the leading byte of its index log.
///
/// A unit moves `Open -> Closed` exactly once and never reopens; `Large`
/// units are created closed to ordinary writes from the start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitState {
    Open,
    Closed,
    Large,
}

impl UnitState {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Open => b'2',
            Self::Closed => b'3',
            Self::Large => b'4',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'2' => Some(Self::Open),
            b'3' => Some(Self::Closed),
            b'4' => Some(Self::Large),
            _ => None,
        }
    }
}

/// One row of the index: where a blob lives inside the unit's binary log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub blob_id: BlobId,
    pub offset: u64,
    pub size: u64,
    pub checksum: String,
    /// Id of the owning file record in the metadata store, when known.
    pub fid: String,
    /// `#` fill bringing the serialized record to the fixed width.
    pub padding: String,
}

#[derive(Debug)]
struct IndexInner {
    state: UnitState,
    entries: HashMap<BlobId, IndexEntry>,
    empty: bool,
}

/// The index log of one unit.
#[derive(Debug)]
pub struct IndexLog {
    path: PathBuf,
    inner: RwLock<IndexInner>,
}

impl IndexLog {
    /// Open the index log, creating it with `initial` state when the backing
    /// file does not exist, otherwise hydrating state and entries from disk.
    /// Returns the log and its on-disk size.
    pub fn open(
        root: &Path,
        shard: ShardId,
        unit: &UnitId,
        initial: UnitState,
    ) -> LogResult<(Self, u64)> {
        let path = layout::index_path(root, shard, unit);
        match layout::file_size(&path)? {
            0 => Self::create(path, initial),
            size => Self::load(path, size),
        }
    }

    fn create(path: PathBuf, initial: UnitState) -> LogResult<(Self, u64)> {
        info!(path = %path.display(), state = ?initial, "creating index log");
        let mut file = File::create(&path)?;
        file.write_all(&[initial.as_byte()])?;
        file.write_all(b"\n[\n]")?;
        Ok((
            Self {
                path,
                inner: RwLock::new(IndexInner {
                    state: initial,
                    entries: HashMap::new(),
                    empty: true,
                }),
            },
            5,
        ))
    }

    fn load(path: PathBuf, size: u64) -> LogResult<(Self, u64)> {
        let bytes = std::fs::read(&path)?;
        if bytes.len() < 5 {
            return Err(LogError::corrupt(&path, "index file shorter than header"));
        }
        let state = UnitState::from_byte(bytes[0])
            .ok_or_else(|| LogError::corrupt(&path, format!("unrecognized state byte {}", bytes[0])))?;

        // Skip the state byte and its newline; the rest is the record array.
        let parsed: Vec<IndexEntry> = serde_json::from_slice(&bytes[2..])
            .map_err(|e| LogError::corrupt(&path, format!("unparsable entry log: {e}")))?;

        let empty = parsed.is_empty();
        let entries = parsed
            .into_iter()
            .map(|entry| (entry.blob_id.clone(), entry))
            .collect::<HashMap<_, _>>();

        info!(
            path = %path.display(),
            state = ?state,
            entries = entries.len(),
            "loaded index log"
        );
        Ok((
            Self {
                path,
                inner: RwLock::new(IndexInner { state, entries, empty }),
            },
            size,
        ))
    }

    pub fn state(&self) -> UnitState {
        self.inner.read().expect("lock poisoned").state
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one entry. Returns the record bytes written. Fails with
    /// [`LogError::UnitClosed`] once the unit has been closed — the only
    /// expected failure mode of this call.
    pub fn put(&self, blob_id: &BlobId, offset: u64, size: u64) -> LogResult<u64> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.state == UnitState::Closed {
            return Err(LogError::UnitClosed);
        }

        let mut entry = IndexEntry {
            blob_id: blob_id.clone(),
            offset,
            size,
            checksum: String::new(),
            fid: String::new(),
            padding: String::new(),
        };
        let base = serde_json::to_string(&entry)
            .map_err(|e| LogError::Serialization(e.to_string()))?;
        entry.padding = padding_for(base.len(), INDEX_RECORD_WIDTH)?;
        let json = serde_json::to_string(&entry)
            .map_err(|e| LogError::Serialization(e.to_string()))?;

        // Flush before exposing in memory, otherwise a reader could see an
        // entry whose binary bytes a crash never persisted.
        let written = append_record(&self.path, &json, inner.empty, INDEX_RECORD_WIDTH)?;
        inner.entries.insert(blob_id.clone(), entry);
        inner.empty = false;

        debug!(blob = %blob_id, offset, size, written, "index log put");
        Ok(written)
    }

    pub fn get(&self, blob_id: &BlobId) -> Option<IndexEntry> {
        self.inner
            .read()
            .expect("lock poisoned")
            .entries
            .get(blob_id)
            .cloned()
    }

    /// Remove the in-memory entry. The log itself is append-only and is not
    /// compacted.
    pub fn delete(&self, blob_id: &BlobId) -> LogResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        match inner.entries.remove(blob_id) {
            Some(_) => Ok(()),
            None => Err(LogError::EntryNotFound(blob_id.clone())),
        }
    }

    /// Drop entries tombstoned in the manifest. Missing ids are ignored;
    /// used only during unit hydration.
    pub fn apply_deletion_log<'a>(&self, blobs: impl IntoIterator<Item = &'a BlobId>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        for blob in blobs {
            inner.entries.remove(blob);
        }
    }

    /// Idempotently flip the persisted state to closed. Further `put` calls
    /// fail; reads are unaffected.
    pub fn close(&self) -> LogResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.state == UnitState::Closed {
            debug!(path = %self.path.display(), "index log already closed");
            return Ok(());
        }

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&[UnitState::Closed.as_byte()])?;
        inner.state = UnitState::Closed;

        info!(path = %self.path.display(), "closed index log");
        Ok(())
    }
}
