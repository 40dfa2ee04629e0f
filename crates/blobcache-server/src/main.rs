use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use blobcache_catalog::{FileCatalog, InMemoryCatalog};
use blobcache_holder::{spawn_hot_swap, BlobHolder};
use blobcache_manager::{spawn_drains, CacheManager, HttpRemoteStore, RemoteStore};
use blobcache_server::{CacheServer, ServerConfig};
use blobcache_types::MIB;

/// Fraction of the requested budget actually handed to the holder, leaving
/// headroom for reservation slack.
const BUDGET_RATIO: f64 = 0.95;

#[derive(Parser)]
#[command(
    name = "blobcache",
    version,
    about = "Disk-resident blob cache in front of a remote object store"
)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the cache byte budget, in MiB.
    #[arg(long)]
    max_cache_mib: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(mib) = args.max_cache_mib {
        config.cache.max_cache_bytes = ((mib * MIB) as f64 * BUDGET_RATIO) as u64;
    }

    let cache_config = Arc::new(config.cache.clone());
    let catalog: Arc<dyn FileCatalog> = Arc::new(InMemoryCatalog::new());
    let holder = Arc::new(BlobHolder::open(
        Arc::clone(&cache_config),
        Arc::clone(&catalog),
    )?);
    let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(cache_config.fetch_timeout)?);
    let manager = Arc::new(CacheManager::new(
        cache_config,
        Arc::clone(&holder),
        catalog,
        remote,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = spawn_drains(Arc::clone(&manager), shutdown_rx.clone());
    tasks.push(spawn_hot_swap(holder, shutdown_rx));

    let server = CacheServer::new(config, manager);
    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}
