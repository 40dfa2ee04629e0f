//! One addressable storage unit: a binary, an index, and a manifest log
//! bound under a shared unit id.

use std::path::Path;

use blobcache_types::{ShardId, UnitId};

use crate::binary::{BinaryLog, Encoding};
use crate::error::LogResult;
use crate::index::{IndexLog, UnitState};
use crate::manifest::ManifestLog;

/// On-disk bytes of a freshly created unit: 5-byte index header plus the
/// 3-byte empty manifest journal. Part of every put reservation.
pub const EMPTY_UNIT_OVERHEAD: u64 = 8;

/// The atomic storage unit of the cache.
pub struct Triplet {
    id: UnitId,
    pub binary: BinaryLog,
    pub index: IndexLog,
    pub manifest: ManifestLog,
}

impl Triplet {
    /// Create or hydrate all three logs of a unit. Returns the triplet and
    /// its combined on-disk size.
    ///
    /// `large` only matters on creation; a hydrated unit's classification is
    /// whatever state its index log recovered. Blobs tombstoned in the
    /// manifest are dropped from the hydrated index so they stay invisible
    /// after restart.
    pub fn open(
        root: &Path,
        shard: ShardId,
        unit: &UnitId,
        large: bool,
        encoding: Encoding,
    ) -> LogResult<(Self, u64)> {
        let initial = if large { UnitState::Large } else { UnitState::Open };
        let (index, index_size) = IndexLog::open(root, shard, unit, initial)?;
        let (manifest, manifest_size) = ManifestLog::open(root, shard, unit)?;
        let (binary, binary_size) = BinaryLog::open(root, shard, unit, encoding)?;

        let tombstones = manifest.deletion_log();
        index.apply_deletion_log(tombstones.iter());

        Ok((
            Self {
                id: unit.clone(),
                binary,
                index,
                manifest,
            },
            index_size + manifest_size + binary_size,
        ))
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// The unit's lifecycle state, as recovered from its index log.
    pub fn state(&self) -> UnitState {
        self.index.state()
    }
}
