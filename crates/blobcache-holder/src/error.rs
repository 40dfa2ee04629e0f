use thiserror::Error;

use blobcache_catalog::CatalogError;
use blobcache_log::LogError;
use blobcache_types::UnitId;

#[derive(Debug, Error)]
pub enum HolderError {
    /// The byte budget cannot fit the reservation. Recoverable: evict and retry.
    #[error("cache full: reservation of {needed} bytes over budget, {in_use} in use")]
    CacheFull { needed: u64, in_use: u64 },

    /// A token names a unit no pool holds.
    #[error("unknown unit: {0}")]
    UnknownUnit(UnitId),

    #[error("no unit eligible for eviction")]
    NoEvictionCandidate,

    #[error("log error: {0}")]
    Log(#[from] LogError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HolderError {
    /// Whether the condition clears on its own (budget pressure, lost races
    /// with the hot-swap loop) as opposed to data corruption or I/O failure.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::CacheFull { .. } | Self::NoEvictionCandidate => true,
            Self::Log(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

pub type HolderResult<T> = Result<T, HolderError>;
