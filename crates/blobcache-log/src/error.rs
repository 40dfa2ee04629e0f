use std::path::PathBuf;

use thiserror::Error;

use blobcache_types::BlobId;

#[derive(Debug, Error)]
pub enum LogError {
    /// Unrecoverable on-disk corruption. The caller must stop operating on
    /// the affected unit; it is never silently repaired.
    #[error("corrupt log file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Write attempt against a unit whose index log is already closed.
    /// Expected during hot-swap; the caller picks a different unit.
    #[error("unit already closed")]
    UnitClosed,

    #[error("index entry already deleted: {0}")]
    EntryNotFound(BlobId),

    #[error("record does not fit the fixed width: {0} bytes")]
    RecordTooLarge(usize),

    #[error("blob id exceeds the {limit}-byte id field: {len} bytes")]
    BlobIdTooLong { len: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type LogResult<T> = Result<T, LogError>;

impl LogError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors the holder treats as expected control flow rather
    /// than unit-fatal conditions.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnitClosed | Self::EntryNotFound(_))
    }
}
