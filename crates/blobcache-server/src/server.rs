use std::sync::Arc;

use tokio::net::TcpListener;

use blobcache_manager::CacheManager;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// The HTTP read surface over one cache manager.
pub struct CacheServer {
    config: ServerConfig,
    manager: Arc<CacheManager>,
}

impl CacheServer {
    pub fn new(config: ServerConfig, manager: Arc<CacheManager>) -> Self {
        Self { config, manager }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.manager))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("blobcache server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
