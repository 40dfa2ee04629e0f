//! The cache manager: read-through lookups backed by asynchronous
//! write-behind population and a delayed GC queue.
//!
//! A read miss enqueues a fetch and returns immediately; a drain loop pulls
//! batches off the queue, pulls bytes from the [`RemoteStore`], and commits
//! them through the holder and the catalog. Eviction likewise happens in two
//! steps: a unit is unlinked from the catalog at once but its files are only
//! destroyed after a grace period.

pub mod error;
pub mod manager;
pub mod remote;

pub use error::{ManagerError, ManagerResult, RemoteError, RemoteResult};
pub use manager::{spawn_drains, CacheManager};
pub use remote::{HttpRemoteStore, InMemoryRemoteStore, RemoteStore};
