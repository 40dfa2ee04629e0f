//! The physical blob holder: admission, placement, rotation, and eviction of
//! storage units under one byte budget.

use std::fs;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use blobcache_catalog::FileCatalog;
use blobcache_log::binary::Encoding;
use blobcache_log::index::{UnitState, INDEX_RECORD_WIDTH};
use blobcache_log::manifest::MANIFEST_RECORD_WIDTH;
use blobcache_log::triplet::EMPTY_UNIT_OVERHEAD;
use blobcache_log::{layout, LogError, Triplet};
use blobcache_types::{BlobId, CacheConfig, Token, UnitId};

use crate::error::{HolderError, HolderResult};
use crate::lru::LruPool;

/// Slack added to every reservation for the bracket rewrites of the two
/// record logs.
const RESERVATION_SLACK: u64 = 4;

/// Attempts a pooled put makes before giving up on racing the hot-swap loop.
const PUT_ATTEMPTS: usize = 3;

/// Owns every storage unit of one shard and the byte budget they share.
///
/// Units are held as `Arc<Triplet>` in three LRU pools keyed by unit id:
/// `open` (accepting writes), `closed` (read-only, eviction candidates first),
/// and `large` (one dedicated unit per oversized blob). All pool operations
/// take `&self`; the holder itself is shared behind an `Arc`.
pub struct BlobHolder {
    config: Arc<CacheConfig>,
    catalog: Arc<dyn FileCatalog>,
    encoding: Encoding,
    open: LruPool<UnitId, Arc<Triplet>>,
    closed: LruPool<UnitId, Arc<Triplet>>,
    large: LruPool<UnitId, Arc<Triplet>>,
    /// Persisted bytes plus outstanding reservations. Signed so transient
    /// reconciliation underflow can be observed and clamped.
    total_bytes: AtomicI64,
    /// Serializes the check-and-add of a reservation; the counter alone
    /// cannot make the admission check atomic.
    reserve_mtx: Mutex<()>,
}

impl BlobHolder {
    /// Open the holder over the configured cache root, reconciling disk
    /// against the catalog before serving.
    ///
    /// Reconciliation: records left pending by a crash are dropped, units on
    /// disk that no live catalog record references are deleted as orphans,
    /// catalog units missing from disk lose their records, and every
    /// surviving unit is hydrated into the pool its persisted state names.
    /// The sequence is idempotent; a second open over the same root is a
    /// no-op apart from logging.
    pub fn open(config: Arc<CacheConfig>, catalog: Arc<dyn FileCatalog>) -> HolderResult<Self> {
        fs::create_dir_all(&config.root_dir)?;
        catalog.delete_pending_files()?;

        let (scanned, disk_total) = layout::scan_units(&config.root_dir, config.shard_id)?;
        let live = catalog.list_unit_ids()?;

        let mut orphan_bytes = 0u64;
        for unit in scanned.iter().filter(|u| !live.contains(u)) {
            let reclaimed = layout::remove_unit_files(&config.root_dir, config.shard_id, unit)?;
            warn!(unit = %unit, reclaimed, "removed orphan unit");
            orphan_bytes += reclaimed;
        }

        let total = disk_total as i64 - orphan_bytes as i64;
        let total = if total < 0 {
            warn!(total, "negative byte total after reconciliation, clamping to zero");
            0
        } else {
            total
        };

        let encoding = if config.block_aligned {
            Encoding::BlockAligned
        } else {
            Encoding::Unaligned
        };
        let holder = Self {
            config,
            catalog,
            encoding,
            open: LruPool::new(),
            closed: LruPool::new(),
            large: LruPool::new(),
            total_bytes: AtomicI64::new(total),
            reserve_mtx: Mutex::new(()),
        };

        for unit in &live {
            if !scanned.contains(unit) {
                warn!(unit = %unit, "catalog unit missing from disk, dropping its records");
                holder.catalog.delete_files_of_unit(unit)?;
                continue;
            }
            let (triplet, _) = Triplet::open(
                &holder.config.root_dir,
                holder.config.shard_id,
                unit,
                false,
                holder.encoding,
            )?;
            let triplet = Arc::new(triplet);
            let pool = match triplet.state() {
                UnitState::Open => &holder.open,
                UnitState::Closed => &holder.closed,
                UnitState::Large => &holder.large,
            };
            debug!(unit = %unit, state = ?triplet.state(), "hydrated unit");
            pool.put(unit.clone(), triplet);
        }

        if holder.open.is_empty() {
            let (_, created) = holder.create_open_unit()?;
            holder.total_bytes.fetch_add(created as i64, Ordering::SeqCst);
        }

        info!(
            open = holder.open.len(),
            closed = holder.closed.len(),
            large = holder.large.len(),
            total = holder.total_bytes(),
            "blob holder ready"
        );
        Ok(holder)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Persisted bytes plus outstanding reservations.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::SeqCst).max(0) as u64
    }

    /// Store one blob. Returns its token.
    ///
    /// Admission is a pessimistic reservation (worst case: the blob lands in
    /// a unit created for it) checked against the budget; over budget is
    /// [`HolderError::CacheFull`] with nothing reserved. On success the
    /// reservation is replaced by the bytes actually written; on failure it
    /// is released, though bytes already in the binary log stay on disk
    /// until their unit is purged.
    pub fn put(&self, blob_id: &BlobId, data: &[u8]) -> HolderResult<Token> {
        let payload = self.encoding.payload_size(data.len());
        let reservation = EMPTY_UNIT_OVERHEAD
            + payload
            + INDEX_RECORD_WIDTH as u64
            + MANIFEST_RECORD_WIDTH as u64
            + RESERVATION_SLACK;
        self.reserve(reservation)?;

        let result = if payload > self.config.large_object_threshold {
            self.put_large(blob_id, data)
        } else {
            self.put_pooled(blob_id, data)
        };
        match result {
            Ok((token, actual)) => {
                self.total_bytes
                    .fetch_add(actual as i64 - reservation as i64, Ordering::SeqCst);
                debug!(token = %token, actual, "stored blob");
                Ok(token)
            }
            Err(e) => {
                self.total_bytes.fetch_sub(reservation as i64, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Retrieve a blob by token. `Ok(None)` means the unit is present but
    /// the blob was deleted; a unit no pool holds is
    /// [`HolderError::UnknownUnit`].
    pub fn get(&self, token: &Token) -> HolderResult<Option<Vec<u8>>> {
        let triplet = if token.large {
            self.large.get(&token.unit_id)
        } else {
            self.open
                .get(&token.unit_id)
                .or_else(|| self.closed.get(&token.unit_id))
        };
        let Some(triplet) = triplet else {
            return Err(HolderError::UnknownUnit(token.unit_id.clone()));
        };
        let Some(entry) = triplet.index.get(&token.blob_id) else {
            return Ok(None);
        };
        Ok(Some(triplet.binary.get(&token.blob_id, entry.offset)?))
    }

    /// Destroy one unit: drop it from its pool, delete its files, release
    /// its bytes. Returns the bytes reclaimed. A unit already gone from the
    /// pools still has its files removed; purging twice reclaims zero.
    ///
    /// An open unit is unpooled as well before its files go, so no writer
    /// can land a blob in a unit whose backing files were just destroyed.
    pub fn purge(&self, unit: &UnitId) -> HolderResult<u64> {
        let pooled = self.open.remove(unit).is_some()
            || self.closed.remove(unit).is_some()
            || self.large.remove(unit).is_some();
        if !pooled {
            debug!(unit = %unit, "purge target not pooled");
        }
        let reclaimed = layout::remove_unit_files(&self.config.root_dir, self.config.shard_id, unit)?;
        self.total_bytes.fetch_sub(reclaimed as i64, Ordering::SeqCst);
        info!(unit = %unit, reclaimed, "purged unit");
        Ok(reclaimed)
    }

    /// The unit the next eviction would take: least-recently-used closed
    /// unit, else least-recently-used large unit.
    pub fn tail_unit_for_eviction(&self) -> Option<UnitId> {
        self.closed.tail_key().or_else(|| self.large.tail_key())
    }

    /// Evict the least-recently-used closed (else large) unit outright:
    /// catalog records, files, and bytes all go. Open units are never
    /// eviction candidates.
    pub fn evict(&self) -> HolderResult<u64> {
        let (unit, _) = self
            .closed
            .pop_tail()
            .or_else(|| self.large.pop_tail())
            .ok_or(HolderError::NoEvictionCandidate)?;
        self.catalog.delete_files_of_unit(&unit)?;
        let reclaimed = layout::remove_unit_files(&self.config.root_dir, self.config.shard_id, &unit)?;
        self.total_bytes.fetch_sub(reclaimed as i64, Ordering::SeqCst);
        info!(unit = %unit, reclaimed, "evicted unit");
        Ok(reclaimed)
    }

    /// One hot-swap pass: every open unit whose binary log has outgrown the
    /// closing threshold is replaced by a fresh open unit and retired into
    /// the closed pool. Readers keep their `Arc` and are never blocked; a
    /// writer racing the swap sees `UnitClosed` and retries elsewhere.
    /// Returns the number of units rotated.
    pub fn swap_once(&self) -> HolderResult<usize> {
        let mut swapped = 0;
        for unit in self.open.keys() {
            let Some(triplet) = self.open.get(&unit) else {
                continue;
            };
            if triplet.binary.len() < self.config.closing_threshold {
                continue;
            }

            // Replacement first, so writers always find an open unit.
            self.reserve(EMPTY_UNIT_OVERHEAD)?;
            if let Err(e) = self.create_open_unit() {
                self.total_bytes
                    .fetch_sub(EMPTY_UNIT_OVERHEAD as i64, Ordering::SeqCst);
                return Err(e);
            }

            self.open.remove(&unit);
            triplet.index.close()?;
            self.closed.put(unit.clone(), triplet);
            info!(unit = %unit, "hot-swapped unit into closed pool");
            swapped += 1;
        }
        Ok(swapped)
    }

    fn reserve(&self, bytes: u64) -> HolderResult<()> {
        let _guard = self.reserve_mtx.lock().expect("lock poisoned");
        let total = self.total_bytes.load(Ordering::SeqCst);
        if total + bytes as i64 > self.config.max_cache_bytes as i64 {
            return Err(HolderError::CacheFull {
                needed: bytes,
                in_use: total.max(0) as u64,
            });
        }
        self.total_bytes.fetch_add(bytes as i64, Ordering::SeqCst);
        Ok(())
    }

    /// Create a fresh open unit and pool it. Accounting is the caller's job.
    fn create_open_unit(&self) -> HolderResult<(Arc<Triplet>, u64)> {
        let unit = UnitId::generate();
        let (triplet, created) = Triplet::open(
            &self.config.root_dir,
            self.config.shard_id,
            &unit,
            false,
            self.encoding,
        )?;
        let triplet = Arc::new(triplet);
        self.open.put(unit.clone(), Arc::clone(&triplet));
        info!(unit = %unit, "opened fresh unit");
        Ok((triplet, created))
    }

    fn put_large(&self, blob_id: &BlobId, data: &[u8]) -> HolderResult<(Token, u64)> {
        let unit = UnitId::generate();
        let (triplet, created) = Triplet::open(
            &self.config.root_dir,
            self.config.shard_id,
            &unit,
            true,
            self.encoding,
        )?;
        let written = write_blob(&triplet, blob_id, data)?;
        self.large.put(unit.clone(), Arc::new(triplet));
        info!(unit = %unit, blob = %blob_id, written, "stored large object in dedicated unit");
        Ok((Token::large(unit, blob_id.clone()), created + written))
    }

    fn put_pooled(&self, blob_id: &BlobId, data: &[u8]) -> HolderResult<(Token, u64)> {
        for _ in 0..PUT_ATTEMPTS {
            let (triplet, created) = self.pick_open_unit()?;
            match write_blob(&triplet, blob_id, data) {
                Ok(written) => {
                    return Ok((
                        Token::new(triplet.id().clone(), blob_id.clone()),
                        created + written,
                    ))
                }
                // Lost the race with the hot-swap loop; pick again.
                Err(HolderError::Log(LogError::UnitClosed)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(HolderError::Log(LogError::UnitClosed))
    }

    /// A uniformly random open unit, creating one if the pool is somehow
    /// empty. The second element is the bytes a creation added to disk.
    fn pick_open_unit(&self) -> HolderResult<(Arc<Triplet>, u64)> {
        let keys = self.open.keys();
        if !keys.is_empty() {
            let key = &keys[rand::thread_rng().gen_range(0..keys.len())];
            if let Some(triplet) = self.open.get(key) {
                return Ok((triplet, 0));
            }
        }
        self.create_open_unit()
    }
}

/// Persist one blob through all three logs of a unit, binary first so an
/// index entry never points at bytes a crash lost. Returns the combined
/// record bytes written.
fn write_blob(triplet: &Triplet, blob_id: &BlobId, data: &[u8]) -> HolderResult<u64> {
    let (offset, written) = triplet.binary.put(blob_id, data)?;
    let index_written = triplet.index.put(blob_id, offset, written)?;
    let manifest_written = triplet.manifest.put(blob_id)?;
    Ok(written + index_written + manifest_written)
}

/// Periodic hot-swap loop, supervised by a watch-channel shutdown signal.
pub fn spawn_hot_swap(
    holder: Arc<BlobHolder>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(holder.config.swap_interval);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match holder.swap_once() {
                        Ok(0) => {}
                        Ok(swapped) => debug!(swapped, "hot-swap pass"),
                        Err(e) => warn!(error = %e, "hot-swap pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("hot-swap loop stopping");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobcache_catalog::{pending_file_id, FileMeta, InMemoryCatalog};
    use blobcache_types::GIB;
    use std::path::Path;

    fn test_config(root: &Path) -> CacheConfig {
        CacheConfig {
            large_object_threshold: 1024,
            ..CacheConfig::with_root(root)
        }
    }

    fn open_holder(config: CacheConfig, catalog: Arc<InMemoryCatalog>) -> BlobHolder {
        BlobHolder::open(Arc::new(config), catalog).unwrap()
    }

    /// Register `token` in the catalog so its unit survives reconciliation.
    fn commit(catalog: &InMemoryCatalog, name: &str, token: &Token, size: u64) {
        let pending = pending_file_id(name);
        catalog
            .create_file(&pending, FileMeta::pending(name, &pending))
            .unwrap();
        catalog
            .commit_file(&pending, &token.to_string(), size)
            .unwrap();
    }

    #[test]
    fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let holder = open_holder(test_config(dir.path()), Arc::new(InMemoryCatalog::new()));

        let blob = BlobId::generate();
        let token = holder.put(&blob, b"payload bytes").unwrap();
        assert!(!token.large);
        assert_eq!(holder.get(&token).unwrap().unwrap(), b"payload bytes");
    }

    #[test]
    fn large_object_gets_dedicated_unit() {
        let dir = tempfile::tempdir().unwrap();
        let holder = open_holder(test_config(dir.path()), Arc::new(InMemoryCatalog::new()));

        let blob = BlobId::generate();
        let token = holder.put(&blob, &vec![7u8; 4096]).unwrap();
        assert!(token.large);
        assert_eq!(holder.get(&token).unwrap().unwrap(), vec![7u8; 4096]);
        assert_eq!(holder.large.len(), 1);
        // the open pool was not involved
        let open_unit = &holder.open.keys()[0];
        assert_ne!(open_unit, &token.unit_id);
    }

    #[test]
    fn unknown_unit_vs_tombstone() {
        let dir = tempfile::tempdir().unwrap();
        let holder = open_holder(test_config(dir.path()), Arc::new(InMemoryCatalog::new()));

        let blob = BlobId::generate();
        let token = holder.put(&blob, b"x").unwrap();

        let bogus = Token::new(UnitId::new("nope0000"), blob.clone());
        assert!(matches!(
            holder.get(&bogus),
            Err(HolderError::UnknownUnit(_))
        ));

        // deleted blob in a live unit reads as a tombstone, not an error
        let missing = Token::new(token.unit_id.clone(), BlobId::new("gone0000"));
        assert!(holder.get(&missing).unwrap().is_none());
    }

    #[test]
    fn over_budget_put_is_rejected_without_reserving() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            max_cache_bytes: 400,
            ..test_config(dir.path())
        };
        let holder = open_holder(config, Arc::new(InMemoryCatalog::new()));
        let before = holder.total_bytes();

        let err = holder.put(&BlobId::generate(), b"too big for the budget");
        assert!(matches!(err, Err(HolderError::CacheFull { .. })));
        assert!(err.unwrap_err().is_recoverable());
        assert_eq!(holder.total_bytes(), before);
    }

    #[test]
    fn total_tracks_bytes_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let shard = config.shard_id;
        let holder = open_holder(config, Arc::new(InMemoryCatalog::new()));

        for payload in [&b"a"[..], b"bb", b"ccc", b"dddd"] {
            holder.put(&BlobId::generate(), payload).unwrap();
        }

        let (_, disk_total) = layout::scan_units(dir.path(), shard).unwrap();
        assert_eq!(holder.total_bytes(), disk_total);
        assert!(holder.total_bytes() <= 4 * GIB);
    }

    #[test]
    fn hot_swap_retires_grown_unit() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            closing_threshold: 1,
            ..test_config(dir.path())
        };
        let holder = open_holder(config, Arc::new(InMemoryCatalog::new()));

        let token = holder.put(&BlobId::generate(), b"grow").unwrap();
        assert_eq!(holder.swap_once().unwrap(), 1);

        assert_eq!(holder.open.len(), 1);
        assert_eq!(holder.closed.len(), 1);
        assert!(holder.closed.contains(&token.unit_id));
        // reads keep working through the closed pool
        assert_eq!(holder.get(&token).unwrap().unwrap(), b"grow");
        // an idle pass rotates nothing
        assert_eq!(holder.swap_once().unwrap(), 0);
    }

    #[test]
    fn eviction_takes_lru_closed_unit_and_honors_promotion() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            closing_threshold: 1,
            ..test_config(dir.path())
        };
        let holder = open_holder(config, Arc::new(InMemoryCatalog::new()));

        let token_a = holder.put(&BlobId::generate(), b"first").unwrap();
        holder.swap_once().unwrap();
        let token_b = holder.put(&BlobId::generate(), b"second").unwrap();
        holder.swap_once().unwrap();
        assert_eq!(holder.tail_unit_for_eviction(), Some(token_a.unit_id.clone()));

        // reading A promotes its unit; B becomes the eviction candidate
        holder.get(&token_a).unwrap();
        assert_eq!(holder.tail_unit_for_eviction(), Some(token_b.unit_id.clone()));

        let reclaimed = holder.evict().unwrap();
        assert!(reclaimed > 0);
        assert!(matches!(
            holder.get(&token_b),
            Err(HolderError::UnknownUnit(_))
        ));
        assert_eq!(holder.get(&token_a).unwrap().unwrap(), b"first");
    }

    #[test]
    fn evict_with_no_candidate_errors() {
        let dir = tempfile::tempdir().unwrap();
        let holder = open_holder(test_config(dir.path()), Arc::new(InMemoryCatalog::new()));
        assert!(matches!(
            holder.evict(),
            Err(HolderError::NoEvictionCandidate)
        ));
    }

    #[test]
    fn purge_reclaims_once() {
        let dir = tempfile::tempdir().unwrap();
        let holder = open_holder(test_config(dir.path()), Arc::new(InMemoryCatalog::new()));

        let token = holder.put(&BlobId::generate(), &vec![1u8; 4096]).unwrap();
        let before = holder.total_bytes();
        let reclaimed = holder.purge(&token.unit_id).unwrap();
        assert!(reclaimed > 0);
        assert_eq!(holder.total_bytes(), before - reclaimed);
        assert_eq!(holder.purge(&token.unit_id).unwrap(), 0);
    }

    #[test]
    fn restart_drops_orphans_and_keeps_cataloged_units() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(InMemoryCatalog::new());

        let (kept, orphaned) = {
            let holder = open_holder(test_config(dir.path()), Arc::clone(&catalog));
            let kept = holder
                .put(&BlobId::generate(), &vec![2u8; 2048])
                .unwrap();
            let orphaned = holder
                .put(&BlobId::generate(), &vec![3u8; 2048])
                .unwrap();
            commit(&catalog, "kept-file", &kept, 2048);
            (kept, orphaned)
        };
        // two large units plus the never-cataloged open unit on disk
        assert_ne!(kept.unit_id, orphaned.unit_id);

        let holder = open_holder(test_config(dir.path()), Arc::clone(&catalog));
        assert_eq!(holder.get(&kept).unwrap().unwrap(), vec![2u8; 2048]);
        assert!(matches!(
            holder.get(&orphaned),
            Err(HolderError::UnknownUnit(_))
        ));

        // idempotent: a second open changes nothing
        let again = open_holder(test_config(dir.path()), Arc::clone(&catalog));
        assert_eq!(again.total_bytes(), holder.total_bytes());
        assert_eq!(again.get(&kept).unwrap().unwrap(), vec![2u8; 2048]);
    }

    #[test]
    fn restart_restores_pool_classification() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(InMemoryCatalog::new());

        let token = {
            let config = CacheConfig {
                closing_threshold: 1,
                ..test_config(dir.path())
            };
            let holder = open_holder(config, Arc::clone(&catalog));
            let token = holder.put(&BlobId::generate(), b"closed bytes").unwrap();
            holder.swap_once().unwrap();
            commit(&catalog, "f", &token, 12);
            // the fresh open unit is not cataloged and will be reaped
            token
        };

        let holder = open_holder(test_config(dir.path()), catalog);
        assert!(holder.closed.contains(&token.unit_id));
        assert_eq!(holder.get(&token).unwrap().unwrap(), b"closed bytes");
        // a replacement open unit was created during reconciliation
        assert_eq!(holder.open.len(), 1);
    }

    #[test]
    fn four_object_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let shard = config.shard_id;
        let holder = open_holder(config, Arc::new(InMemoryCatalog::new()));

        let payloads: Vec<(&[u8], BlobId)> = [&b"a"[..], b"bb", b"ccc", b"dddd"]
            .into_iter()
            .map(|p| (p, BlobId::generate()))
            .collect();
        let tokens: Vec<Token> = payloads
            .iter()
            .map(|(data, blob)| holder.put(blob, data).unwrap())
            .collect();

        for ((data, _), token) in payloads.iter().zip(&tokens) {
            assert_eq!(holder.get(token).unwrap().unwrap(), *data);
        }
        let (_, disk_total) = layout::scan_units(dir.path(), shard).unwrap();
        assert_eq!(holder.total_bytes(), disk_total);

        // four distinct tokens, all addressing the single open unit
        for (i, token) in tokens.iter().enumerate() {
            for other in &tokens[i + 1..] {
                assert_ne!(token, other);
            }
        }
        let open_units = holder.open.keys();
        assert_eq!(open_units.len(), 1);
        for token in &tokens {
            assert_eq!(token.unit_id, open_units[0]);
        }

        // purging that unit takes all four blobs with it
        assert!(holder.purge(&open_units[0]).unwrap() > 0);
        for token in &tokens {
            assert!(matches!(
                holder.get(token),
                Err(HolderError::UnknownUnit(_))
            ));
        }
    }

    #[test]
    fn purge_of_open_unit_unpools_it_first() {
        let dir = tempfile::tempdir().unwrap();
        let holder = open_holder(test_config(dir.path()), Arc::new(InMemoryCatalog::new()));

        let old = holder.put(&BlobId::generate(), b"doomed").unwrap();
        holder.purge(&old.unit_id).unwrap();
        assert!(!holder.open.contains(&old.unit_id));
        assert!(matches!(
            holder.get(&old),
            Err(HolderError::UnknownUnit(_))
        ));

        // the next put lands in a freshly created unit, not the purged one
        let fresh = holder.put(&BlobId::generate(), b"alive").unwrap();
        assert_ne!(fresh.unit_id, old.unit_id);
        assert_eq!(holder.get(&fresh).unwrap().unwrap(), b"alive");
    }
}
