use serde::{Deserialize, Serialize};

use blobcache_types::UnitId;

/// Prefix of a file id whose cache population is still in flight.
pub const PENDING_FILE_PREFIX: &str = "PD_";

/// Catalog id used while a file's fetch-and-populate is pending.
pub fn pending_file_id(file_id: &str) -> String {
    format!("{PENDING_FILE_PREFIX}{file_id}")
}

/// Lifecycle of a catalog file record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    /// Created, fetch in flight, no blob token yet.
    Pending,
    /// Committed with a token; servable from cache.
    Ready,
    Deleted,
}

/// One file record in the metadata store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileMeta {
    /// Source name (for this engine, the remote URL).
    pub name: String,
    pub id: String,
    pub state: FileState,
    /// Blob token, set when the record is committed.
    pub token: Option<String>,
    pub size: u64,
    /// Unit owning the file's bytes, recovered from the token on commit.
    pub unit_id: Option<UnitId>,
}

impl FileMeta {
    /// A fresh pending record for a file about to be fetched.
    pub fn pending(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            state: FileState::Pending,
            token: None,
            size: 0,
            unit_id: None,
        }
    }
}
