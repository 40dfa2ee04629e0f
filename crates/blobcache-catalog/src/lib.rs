//! Narrow boundary to the metadata store that records which files live in
//! the cache and which units they occupy.
//!
//! The engine never issues queries against the backing store directly; it
//! only sees the [`FileCatalog`] trait. [`InMemoryCatalog`] is the
//! implementation used by tests and embedding; a relational implementation
//! lives behind the same trait.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{CatalogError, CatalogResult};
pub use memory::InMemoryCatalog;
pub use traits::FileCatalog;
pub use types::{pending_file_id, FileMeta, FileState, PENDING_FILE_PREFIX};
