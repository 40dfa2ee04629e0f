//! The physical blob holder: storage units kept in LRU pools under one
//! global byte budget.
//!
//! [`BlobHolder`] owns three pools of [`blobcache_log::Triplet`]s (open,
//! closed, large), admits writes through pessimistic byte reservations, and
//! rotates open units into the closed pool once they outgrow the closing
//! threshold. [`LruPool`] is the generic recency structure backing the pools.

pub mod error;
pub mod holder;
pub mod lru;

pub use error::{HolderError, HolderResult};
pub use holder::{spawn_hot_swap, BlobHolder};
pub use lru::LruPool;
