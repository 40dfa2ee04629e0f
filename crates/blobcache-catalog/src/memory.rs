use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use blobcache_types::{Token, UnitId};

use crate::error::{CatalogError, CatalogResult};
use crate::traits::FileCatalog;
use crate::types::{FileMeta, FileState, PENDING_FILE_PREFIX};

/// In-memory, HashMap-based file catalog.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` and
/// cloned on read.
pub struct InMemoryCatalog {
    files: RwLock<HashMap<String, FileMeta>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCatalog for InMemoryCatalog {
    fn list_file(&self, file_id: &str, state: FileState) -> CatalogResult<Option<FileMeta>> {
        let files = self.files.read().expect("lock poisoned");
        Ok(files
            .get(file_id)
            .filter(|meta| meta.state == state)
            .cloned())
    }

    fn create_file(&self, file_id: &str, meta: FileMeta) -> CatalogResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        if files.contains_key(file_id) {
            return Err(CatalogError::FileExists(file_id.to_string()));
        }
        files.insert(file_id.to_string(), meta);
        Ok(())
    }

    fn commit_file(&self, file_id: &str, token: &str, size: u64) -> CatalogResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        let mut meta = files
            .remove(file_id)
            .ok_or_else(|| CatalogError::FileNotFound(file_id.to_string()))?;

        meta.state = FileState::Ready;
        meta.token = Some(token.to_string());
        meta.size = size;
        meta.unit_id = Token::parse(token).ok().map(|t| t.unit_id);

        // A committed record is addressed by its plain id, not the pending one.
        let ready_id = file_id
            .strip_prefix(PENDING_FILE_PREFIX)
            .unwrap_or(file_id)
            .to_string();
        meta.id = ready_id.clone();
        debug!(file = %ready_id, token, size, "committed file record");
        files.insert(ready_id, meta);
        Ok(())
    }

    fn delete_file(&self, file_id: &str) -> CatalogResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::FileNotFound(file_id.to_string()))
    }

    fn delete_files_of_unit(&self, unit: &UnitId) -> CatalogResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        files.retain(|_, meta| meta.unit_id.as_ref() != Some(unit));
        Ok(())
    }

    fn list_unit_ids(&self) -> CatalogResult<Vec<UnitId>> {
        let files = self.files.read().expect("lock poisoned");
        let mut units: Vec<UnitId> = files
            .values()
            .filter(|meta| meta.state != FileState::Deleted)
            .filter_map(|meta| meta.unit_id.clone())
            .collect();
        units.sort();
        units.dedup();
        Ok(units)
    }

    fn delete_pending_files(&self) -> CatalogResult<()> {
        let mut files = self.files.write().expect("lock poisoned");
        files.retain(|_, meta| meta.state != FileState::Pending);
        Ok(())
    }
}
