use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ids::ShardId;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Engine configuration, constructed once at startup and passed by reference
/// into each component's constructor. No component reads ambient global state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding every unit's three `.dat` files.
    pub root_dir: PathBuf,
    /// Id of this holder instance; baked into unit file names.
    pub shard_id: ShardId,
    /// Global byte budget across all persisted unit files.
    pub max_cache_bytes: u64,
    /// An open unit whose binary log grows past this is hot-swapped closed.
    pub closing_threshold: u64,
    /// Payloads with an on-disk footprint above this get a dedicated unit.
    pub large_object_threshold: u64,
    /// Encode binary records as fixed 4 KiB chunks instead of raw payloads.
    pub block_aligned: bool,
    /// Items popped from the write-behind queue per drain tick.
    pub write_batch_size: usize,
    /// A unit enqueued for purge is only destroyed after this grace period.
    pub purge_grace: Duration,
    /// Tick interval of the hot-swap loop.
    pub swap_interval: Duration,
    /// Tick interval of the write-drain and GC-drain loops.
    pub drain_interval: Duration,
    /// Bound on each remote head/fetch request.
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/var/lib/blobcache"),
            shard_id: ShardId(0),
            max_cache_bytes: 4 * GIB,
            closing_threshold: 200 * MIB,
            large_object_threshold: 64 * MIB,
            block_aligned: false,
            write_batch_size: 5,
            purge_grace: Duration::from_millis(1000),
            swap_interval: Duration::from_millis(200),
            drain_interval: Duration::from_millis(200),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Default configuration rooted at the given directory.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CacheConfig::default();
        assert_eq!(c.max_cache_bytes, 4 * GIB);
        assert_eq!(c.closing_threshold, 200 * MIB);
        assert_eq!(c.write_batch_size, 5);
        assert!(!c.block_aligned);
    }

    #[test]
    fn with_root_overrides_dir_only() {
        let c = CacheConfig::with_root("/tmp/cache");
        assert_eq!(c.root_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(c.max_cache_bytes, CacheConfig::default().max_cache_bytes);
    }
}
