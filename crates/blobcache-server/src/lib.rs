//! HTTP read surface for the blobcache engine.
//!
//! One endpoint does the work: `GET /getFile?url=...` serves the cached copy
//! of a remote object, or schedules its population and answers 404 until the
//! write-behind drain has committed it.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::CacheServer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use blobcache_catalog::{FileCatalog, InMemoryCatalog};
    use blobcache_holder::BlobHolder;
    use blobcache_manager::{CacheManager, InMemoryRemoteStore, RemoteStore};
    use blobcache_types::CacheConfig;

    use crate::router::build_router;

    fn test_stack(root: &std::path::Path) -> (Arc<CacheManager>, Arc<InMemoryRemoteStore>) {
        let config = Arc::new(CacheConfig::with_root(root));
        let catalog: Arc<dyn FileCatalog> = Arc::new(InMemoryCatalog::new());
        let holder = Arc::new(BlobHolder::open(Arc::clone(&config), Arc::clone(&catalog)).unwrap());
        let remote = Arc::new(InMemoryRemoteStore::new());
        let manager = Arc::new(CacheManager::new(
            config,
            holder,
            catalog,
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
        ));
        (manager, remote)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_stack(dir.path());
        let app = build_router(manager);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn get_file_misses_then_serves() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, remote) = test_stack(dir.path());
        remote.insert("http://oss/obj.bin", b"cached bytes".to_vec());
        let uri = "/getFile?url=http%3A%2F%2Foss%2Fobj.bin";

        // first request only schedules the fetch
        let app = build_router(Arc::clone(&manager));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        manager.drain_writes_once().await;

        let app = build_router(Arc::clone(&manager));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "application/octet-stream"
        );
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"obj.bin\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"cached bytes");
    }

    #[tokio::test]
    async fn get_file_requires_url_param() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_stack(dir.path());
        let app = build_router(manager);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/getFile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }
}
