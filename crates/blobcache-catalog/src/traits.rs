use blobcache_types::UnitId;

use crate::error::CatalogResult;
use crate::types::{FileMeta, FileState};

/// File-record operations the engine needs from the metadata store.
///
/// Implementations must satisfy:
/// - `commit_file` transitions a pending record to ready exactly once and
///   records token, size, and owning unit.
/// - `list_unit_ids` is the authoritative set of live units; a unit on disk
///   but absent here is an orphan and is deleted at startup.
/// - `delete_pending_files` clears records left pending by a crash.
pub trait FileCatalog: Send + Sync {
    /// Look up a file record by id in the given state. `Ok(None)` if absent.
    fn list_file(&self, file_id: &str, state: FileState) -> CatalogResult<Option<FileMeta>>;

    /// Create a new file record. Errors if the id already exists.
    fn create_file(&self, file_id: &str, meta: FileMeta) -> CatalogResult<()>;

    /// Seal a pending record: set token and size, mark it ready.
    fn commit_file(&self, file_id: &str, token: &str, size: u64) -> CatalogResult<()>;

    /// Remove one file record. Errors if absent.
    fn delete_file(&self, file_id: &str) -> CatalogResult<()>;

    /// Remove every file record whose bytes live in the given unit.
    fn delete_files_of_unit(&self, unit: &UnitId) -> CatalogResult<()>;

    /// Distinct unit ids referenced by live (non-deleted) file records.
    fn list_unit_ids(&self) -> CatalogResult<Vec<UnitId>>;

    /// Drop every record still in the pending state.
    fn delete_pending_files(&self) -> CatalogResult<()>;
}
