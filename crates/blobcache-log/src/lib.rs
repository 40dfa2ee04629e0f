//! On-disk storage format for the blobcache engine.
//!
//! One storage unit is a *triplet* of same-named files under the cache root:
//!
//! - **Binary log** (`binary_<shard>_<unit>.dat`) — append-only blob payloads,
//!   raw or 4 KiB block-aligned
//! - **Index log** (`idx_h_<shard>_<unit>.dat`) — persisted unit state plus the
//!   ordered catalogue of blob id → (offset, size)
//! - **Manifest log** (`mf_h_<shard>_<unit>.dat`) — append-only put/delete
//!   action journal, replayed at startup to restore tombstones

pub mod binary;
pub mod error;
pub mod index;
pub mod layout;
pub mod manifest;
mod record;
pub mod triplet;

pub use binary::{BinaryLog, Encoding, BLOCK_SIZE, CHUNK_CONTENT_SIZE, UNALIGNED_HEADER};
pub use error::{LogError, LogResult};
pub use index::{IndexEntry, IndexLog, UnitState, INDEX_RECORD_WIDTH};
pub use manifest::{ManifestAction, ManifestLog, MANIFEST_RECORD_WIDTH};
pub use triplet::{Triplet, EMPTY_UNIT_OVERHEAD};
