//! Append-only put/delete action journal for one unit.
//!
//! Index deletions are in-memory only, so the manifest is the sole durable
//! record of which blobs were tombstoned; its deletion log is replayed when a
//! unit is hydrated. The manifest deliberately never closes — deletions can
//! arrive at any point in a unit's life, including after the unit itself has
//! stopped accepting puts.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use blobcache_types::{BlobId, ShardId, UnitId};

use crate::error::{LogError, LogResult};
use crate::layout;
use crate::record::{append_record, padding_for};

/// Fixed record width, separator included.
pub const MANIFEST_RECORD_WIDTH: usize = 202;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestAction {
    Put,
    Delete,
}

impl ManifestAction {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Put => b'P',
            Self::Delete => b'D',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'P' => Some(Self::Put),
            b'D' => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ManifestEntry {
    blob_id: BlobId,
    action: u8,
    padding: String,
}

#[derive(Debug)]
struct ManifestInner {
    empty: bool,
    /// Blobs whose latest journaled action is a deletion.
    deletions: HashMap<BlobId, ManifestAction>,
}

/// The manifest log of one unit.
#[derive(Debug)]
pub struct ManifestLog {
    path: PathBuf,
    inner: RwLock<ManifestInner>,
}

impl ManifestLog {
    /// Open the manifest log, creating an empty journal when the backing file
    /// does not exist. Returns the log and its on-disk size.
    pub fn open(root: &Path, shard: ShardId, unit: &UnitId) -> LogResult<(Self, u64)> {
        let path = layout::manifest_path(root, shard, unit);
        match layout::file_size(&path)? {
            0 => Self::create(path),
            size => Self::load(path, size),
        }
    }

    fn create(path: PathBuf) -> LogResult<(Self, u64)> {
        info!(path = %path.display(), "creating manifest log");
        let mut file = File::create(&path)?;
        file.write_all(b"[\n]")?;
        Ok((
            Self {
                path,
                inner: RwLock::new(ManifestInner {
                    empty: true,
                    deletions: HashMap::new(),
                }),
            },
            3,
        ))
    }

    fn load(path: PathBuf, size: u64) -> LogResult<(Self, u64)> {
        let bytes = std::fs::read(&path)?;
        let parsed: Vec<ManifestEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| LogError::corrupt(&path, format!("unparsable action journal: {e}")))?;

        let empty = parsed.is_empty();
        let mut deletions = HashMap::new();
        for entry in &parsed {
            match ManifestAction::from_byte(entry.action) {
                Some(ManifestAction::Delete) => {
                    deletions.insert(entry.blob_id.clone(), ManifestAction::Delete);
                }
                Some(ManifestAction::Put) => {
                    deletions.remove(&entry.blob_id);
                }
                None => {
                    return Err(LogError::corrupt(
                        &path,
                        format!("unrecognized action byte {}", entry.action),
                    ))
                }
            }
        }

        info!(
            path = %path.display(),
            entries = parsed.len(),
            deletions = deletions.len(),
            "loaded manifest log"
        );
        Ok((
            Self {
                path,
                inner: RwLock::new(ManifestInner { empty, deletions }),
            },
            size,
        ))
    }

    /// Journal a put action. Returns the record bytes written.
    pub fn put(&self, blob_id: &BlobId) -> LogResult<u64> {
        self.append(blob_id, ManifestAction::Put)
    }

    /// Journal a delete action. Returns the record bytes written.
    pub fn delete(&self, blob_id: &BlobId) -> LogResult<u64> {
        self.append(blob_id, ManifestAction::Delete)
    }

    fn append(&self, blob_id: &BlobId, action: ManifestAction) -> LogResult<u64> {
        let mut inner = self.inner.write().expect("lock poisoned");

        let mut entry = ManifestEntry {
            blob_id: blob_id.clone(),
            action: action.as_byte(),
            padding: String::new(),
        };
        let base = serde_json::to_string(&entry)
            .map_err(|e| LogError::Serialization(e.to_string()))?;
        entry.padding = padding_for(base.len(), MANIFEST_RECORD_WIDTH)?;
        let json = serde_json::to_string(&entry)
            .map_err(|e| LogError::Serialization(e.to_string()))?;

        let written = append_record(&self.path, &json, inner.empty, MANIFEST_RECORD_WIDTH)?;
        inner.empty = false;
        match action {
            ManifestAction::Delete => {
                inner.deletions.insert(blob_id.clone(), action);
            }
            ManifestAction::Put => {
                inner.deletions.remove(blob_id);
            }
        }

        debug!(blob = %blob_id, action = ?action, written, "manifest log append");
        Ok(written)
    }

    /// Blobs whose latest journaled action is a deletion, for startup
    /// reconciliation against the index.
    pub fn deletion_log(&self) -> Vec<BlobId> {
        self.inner
            .read()
            .expect("lock poisoned")
            .deletions
            .keys()
            .cloned()
            .collect()
    }
}
