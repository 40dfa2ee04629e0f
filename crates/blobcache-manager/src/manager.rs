//! Write-behind population and delayed GC over the blob holder.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use blobcache_catalog::{pending_file_id, CatalogError, FileCatalog, FileMeta, FileState};
use blobcache_holder::{BlobHolder, HolderError};
use blobcache_types::{BlobId, CacheConfig, Token, UnitId};

use crate::error::ManagerResult;
use crate::remote::RemoteStore;

#[derive(Clone)]
struct WriteItem {
    file_id: String,
    file_name: String,
}

struct WriteQueue {
    items: VecDeque<WriteItem>,
    /// Names currently queued, for duplicate suppression.
    names: HashSet<String>,
}

struct PurgeItem {
    unit: UnitId,
    queued_at: Instant,
}

enum Outcome {
    Committed,
    Dropped,
    Requeue(WriteItem),
    CacheFull,
}

/// Front door of the cache: read-through lookups, the write-behind fetch
/// queue, and the delayed purge queue.
pub struct CacheManager {
    config: Arc<CacheConfig>,
    holder: Arc<BlobHolder>,
    catalog: Arc<dyn FileCatalog>,
    remote: Arc<dyn RemoteStore>,
    writes: Mutex<WriteQueue>,
    purges: Mutex<VecDeque<PurgeItem>>,
}

impl CacheManager {
    pub fn new(
        config: Arc<CacheConfig>,
        holder: Arc<BlobHolder>,
        catalog: Arc<dyn FileCatalog>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            config,
            holder,
            catalog,
            remote,
            writes: Mutex::new(WriteQueue {
                items: VecDeque::new(),
                names: HashSet::new(),
            }),
            purges: Mutex::new(VecDeque::new()),
        }
    }

    pub fn holder(&self) -> &Arc<BlobHolder> {
        &self.holder
    }

    pub fn write_queue_len(&self) -> usize {
        self.writes.lock().expect("lock poisoned").items.len()
    }

    pub fn purge_queue_len(&self) -> usize {
        self.purges.lock().expect("lock poisoned").len()
    }

    /// Serve a file from cache, or schedule its population.
    ///
    /// `Ok(None)` means the fetch is (now) in flight and the caller should
    /// retry later. A catalog record pointing at an evicted unit or a
    /// deleted blob is treated as a miss: the stale record is dropped and
    /// the file refetched.
    pub fn read_through(&self, url: &str) -> ManagerResult<Option<Vec<u8>>> {
        if let Some(meta) = self.catalog.list_file(url, FileState::Ready)? {
            if let Some(token) = meta.token.as_deref() {
                let token = Token::parse(token)?;
                match self.holder.get(&token) {
                    Ok(Some(bytes)) => return Ok(Some(bytes)),
                    Ok(None) => {
                        warn!(url, "record points at a deleted blob, refetching");
                        let _ = self.catalog.delete_file(url);
                    }
                    Err(HolderError::UnknownUnit(unit)) => {
                        warn!(url, unit = %unit, "record points at an evicted unit, refetching");
                        let _ = self.catalog.delete_file(url);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let pending = pending_file_id(url);
        match self
            .catalog
            .create_file(&pending, FileMeta::pending(url, &pending))
        {
            Ok(()) => {
                self.enqueue_write(pending, url.to_string());
            }
            Err(CatalogError::FileExists(_)) => debug!(url, "fetch already in flight"),
            Err(e) => return Err(e.into()),
        }
        Ok(None)
    }

    /// Queue one fetch-and-populate item. Returns false when a fetch for the
    /// same name is already queued.
    pub fn enqueue_write(&self, file_id: String, file_name: String) -> bool {
        let mut writes = self.writes.lock().expect("lock poisoned");
        if !writes.names.insert(file_name.clone()) {
            debug!(url = %file_name, "write already queued");
            return false;
        }
        writes.items.push_back(WriteItem { file_id, file_name });
        true
    }

    /// Pick the holder's eviction candidate, unlink its catalog records, and
    /// queue its physical destruction. The files outlive the records by the
    /// purge grace period so a just-started read is not pulled out from
    /// under the reader. Returns false when nothing was queued.
    pub fn enqueue_deletion(&self) -> ManagerResult<bool> {
        let Some(unit) = self.holder.tail_unit_for_eviction() else {
            warn!("eviction requested with no candidate unit");
            return Ok(false);
        };
        {
            let purges = self.purges.lock().expect("lock poisoned");
            if purges.iter().any(|p| p.unit == unit) {
                debug!(unit = %unit, "unit already queued for purge");
                return Ok(false);
            }
        }
        self.catalog.delete_files_of_unit(&unit)?;
        self.purges.lock().expect("lock poisoned").push_back(PurgeItem {
            unit: unit.clone(),
            queued_at: Instant::now(),
        });
        info!(unit = %unit, "unit queued for delayed purge");
        Ok(true)
    }

    /// Drain one batch off the write queue, fetching and committing each
    /// item concurrently and joining the batch before returning. Transient
    /// remote failures put the item back on the queue; the next drain tick
    /// is the retry backoff. Returns the number of items settled.
    pub async fn drain_writes_once(&self) -> usize {
        let batch = {
            let mut writes = self.writes.lock().expect("lock poisoned");
            let take = writes.items.len().min(self.config.write_batch_size);
            let mut batch = Vec::with_capacity(take);
            for _ in 0..take {
                if let Some(item) = writes.items.pop_front() {
                    writes.names.remove(&item.file_name);
                    batch.push(item);
                }
            }
            batch
        };
        if batch.is_empty() {
            return 0;
        }

        let mut tasks = JoinSet::new();
        for item in batch {
            tasks.spawn(populate_one(
                Arc::clone(&self.config),
                Arc::clone(&self.holder),
                Arc::clone(&self.catalog),
                Arc::clone(&self.remote),
                item,
            ));
        }

        let mut settled = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Committed) | Ok(Outcome::Dropped) => settled += 1,
                Ok(Outcome::Requeue(item)) => {
                    self.enqueue_write(item.file_id, item.file_name);
                }
                Ok(Outcome::CacheFull) => {
                    if let Err(e) = self.enqueue_deletion() {
                        warn!(error = %e, "eviction after cache-full failed");
                    }
                    settled += 1;
                }
                Err(e) => error!(error = %e, "populate task panicked"),
            }
        }
        settled
    }

    /// Destroy every queued unit whose grace period has elapsed. Returns the
    /// bytes reclaimed.
    pub fn drain_purges_once(&self) -> ManagerResult<u64> {
        let mut reclaimed = 0;
        loop {
            let unit = {
                let mut purges = self.purges.lock().expect("lock poisoned");
                match purges.front() {
                    Some(p) if p.queued_at.elapsed() >= self.config.purge_grace => {
                        purges.pop_front().map(|p| p.unit)
                    }
                    _ => None,
                }
            };
            let Some(unit) = unit else { break };
            reclaimed += self.holder.purge(&unit)?;
        }
        Ok(reclaimed)
    }
}

/// Fetch one remote object and commit it into the cache.
async fn populate_one(
    config: Arc<CacheConfig>,
    holder: Arc<BlobHolder>,
    catalog: Arc<dyn FileCatalog>,
    remote: Arc<dyn RemoteStore>,
    item: WriteItem,
) -> Outcome {
    let url = item.file_name.as_str();

    let size = match remote.head(url).await {
        Ok(Some(size)) => size,
        Ok(None) => {
            info!(url, "remote object absent, dropping fetch");
            discard_record(&*catalog, &item);
            return Outcome::Dropped;
        }
        Err(e) => {
            warn!(url, error = %e, "head failed, requeueing");
            return Outcome::Requeue(item);
        }
    };
    if size > config.max_cache_bytes {
        warn!(url, size, "object exceeds the whole cache budget, dropping");
        discard_record(&*catalog, &item);
        return Outcome::Dropped;
    }

    let body = match remote.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url, error = %e, "fetch failed, requeueing");
            return Outcome::Requeue(item);
        }
    };

    match holder.put(&BlobId::generate(), &body) {
        Ok(token) => {
            if let Err(e) = catalog.commit_file(&item.file_id, &token.to_string(), body.len() as u64)
            {
                // Bytes are on disk but unreferenced; startup reconciliation
                // will reap the unit if it stays that way.
                error!(url, error = %e, "commit failed after persisting blob");
                return Outcome::Dropped;
            }
            debug!(url, token = %token, "populated file");
            Outcome::Committed
        }
        Err(HolderError::CacheFull { .. }) => {
            info!(url, "cache full, rolling back and requesting eviction");
            discard_record(&*catalog, &item);
            Outcome::CacheFull
        }
        Err(e) => {
            error!(url, error = %e, "persist failed, dropping fetch");
            discard_record(&*catalog, &item);
            Outcome::Dropped
        }
    }
}

fn discard_record(catalog: &dyn FileCatalog, item: &WriteItem) {
    if let Err(e) = catalog.delete_file(&item.file_id) {
        debug!(file = %item.file_id, error = %e, "pending record already gone");
    }
}

/// Start the write-drain and purge-drain loops as supervised periodic tasks.
pub fn spawn_drains(
    manager: Arc<CacheManager>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let write_loop = {
        let manager = Arc::clone(&manager);
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(manager.config.drain_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        manager.drain_writes_once().await;
                    }
                    _ = shutdown.changed() => {
                        info!("write drain stopping");
                        return;
                    }
                }
            }
        })
    };

    let purge_loop = {
        let mut shutdown = shutdown;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(manager.config.drain_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(e) = manager.drain_purges_once() {
                            warn!(error = %e, "purge drain failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("purge drain stopping");
                        return;
                    }
                }
            }
        })
    };

    vec![write_loop, purge_loop]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemoteStore;
    use blobcache_catalog::InMemoryCatalog;
    use std::path::Path;
    use std::time::Duration;

    fn setup(
        dir: &Path,
        tweak: impl FnOnce(&mut CacheConfig),
    ) -> (CacheManager, Arc<InMemoryRemoteStore>, Arc<InMemoryCatalog>) {
        let mut config = CacheConfig::with_root(dir);
        tweak(&mut config);
        let config = Arc::new(config);
        let catalog = Arc::new(InMemoryCatalog::new());
        let holder = Arc::new(
            BlobHolder::open(Arc::clone(&config), Arc::clone(&catalog) as Arc<dyn FileCatalog>)
                .unwrap(),
        );
        let remote = Arc::new(InMemoryRemoteStore::new());
        let manager = CacheManager::new(
            config,
            holder,
            Arc::clone(&catalog) as Arc<dyn FileCatalog>,
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
        );
        (manager, remote, catalog)
    }

    #[tokio::test]
    async fn read_through_populates_on_drain() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, remote, _) = setup(dir.path(), |_| {});
        remote.insert("http://oss/f1", b"file one".to_vec());

        assert_eq!(manager.read_through("http://oss/f1").unwrap(), None);
        assert_eq!(manager.write_queue_len(), 1);

        assert_eq!(manager.drain_writes_once().await, 1);
        assert_eq!(
            manager.read_through("http://oss/f1").unwrap(),
            Some(b"file one".to_vec())
        );
        assert_eq!(manager.write_queue_len(), 0);
    }

    #[tokio::test]
    async fn duplicate_misses_enqueue_once() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, remote, _) = setup(dir.path(), |_| {});
        remote.insert("http://oss/f1", b"x".to_vec());

        assert_eq!(manager.read_through("http://oss/f1").unwrap(), None);
        assert_eq!(manager.read_through("http://oss/f1").unwrap(), None);
        assert_eq!(manager.write_queue_len(), 1);
    }

    #[tokio::test]
    async fn absent_remote_object_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _, catalog) = setup(dir.path(), |_| {});

        assert_eq!(manager.read_through("http://oss/missing").unwrap(), None);
        assert_eq!(manager.drain_writes_once().await, 1);

        // pending record rolled back, nothing left in flight
        let pending = pending_file_id("http://oss/missing");
        assert!(catalog
            .list_file(&pending, FileState::Pending)
            .unwrap()
            .is_none());
        assert_eq!(manager.write_queue_len(), 0);
    }

    #[tokio::test]
    async fn transient_failure_requeues_for_next_tick() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, remote, _) = setup(dir.path(), |_| {});
        remote.insert("http://oss/f1", b"eventually".to_vec());
        remote.fail_next(1);

        manager.read_through("http://oss/f1").unwrap();
        assert_eq!(manager.drain_writes_once().await, 0);
        assert_eq!(manager.write_queue_len(), 1);

        assert_eq!(manager.drain_writes_once().await, 1);
        assert_eq!(
            manager.read_through("http://oss/f1").unwrap(),
            Some(b"eventually".to_vec())
        );
    }

    #[tokio::test]
    async fn oversized_object_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, remote, catalog) = setup(dir.path(), |c| c.max_cache_bytes = 1024);
        remote.insert("http://oss/huge", vec![0u8; 4096]);

        manager.read_through("http://oss/huge").unwrap();
        assert_eq!(manager.drain_writes_once().await, 1);

        let pending = pending_file_id("http://oss/huge");
        assert!(catalog
            .list_file(&pending, FileState::Pending)
            .unwrap()
            .is_none());
        // the cache itself stayed untouched
        assert_eq!(manager.read_through("http://oss/huge").unwrap(), None);
    }

    #[tokio::test]
    async fn cache_full_rolls_back_and_requests_eviction() {
        let dir = tempfile::tempdir().unwrap();
        // head passes the budget check but the put reservation cannot fit
        let (manager, remote, catalog) = setup(dir.path(), |c| c.max_cache_bytes = 2048);
        remote.insert("http://oss/tight", vec![0u8; 2000]);

        manager.read_through("http://oss/tight").unwrap();
        assert_eq!(manager.drain_writes_once().await, 1);

        let pending = pending_file_id("http://oss/tight");
        assert!(catalog
            .list_file(&pending, FileState::Pending)
            .unwrap()
            .is_none());
        // no closed or large unit existed, so nothing could be queued
        assert_eq!(manager.purge_queue_len(), 0);
    }

    #[tokio::test]
    async fn purge_waits_out_the_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, remote, catalog) = setup(dir.path(), |c| {
            c.closing_threshold = 1;
            c.purge_grace = Duration::from_millis(50);
        });
        remote.insert("http://oss/f1", b"to be evicted".to_vec());

        manager.read_through("http://oss/f1").unwrap();
        manager.drain_writes_once().await;
        manager.holder().swap_once().unwrap();

        let meta = catalog
            .list_file("http://oss/f1", FileState::Ready)
            .unwrap()
            .unwrap();
        let token = Token::parse(meta.token.as_deref().unwrap()).unwrap();

        assert!(manager.enqueue_deletion().unwrap());
        // queueing again is a no-op while the unit waits
        assert!(!manager.enqueue_deletion().unwrap());
        assert_eq!(manager.purge_queue_len(), 1);

        // within the grace period the bytes stay readable
        assert_eq!(manager.drain_purges_once().unwrap(), 0);
        assert!(manager.holder().get(&token).unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(manager.drain_purges_once().unwrap() > 0);
        assert!(matches!(
            manager.holder().get(&token),
            Err(HolderError::UnknownUnit(_))
        ));
        assert_eq!(manager.purge_queue_len(), 0);
    }
}
