use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use blobcache_manager::CacheManager;

use crate::handler;

/// Build the axum router with all cache endpoints.
pub fn build_router(manager: Arc<CacheManager>) -> Router {
    Router::new()
        .route("/getFile", get(handler::get_file))
        .route("/v1/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}
