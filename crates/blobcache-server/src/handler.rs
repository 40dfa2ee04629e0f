use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use blobcache_manager::CacheManager;

#[derive(Debug, Deserialize)]
pub struct GetFileParams {
    /// Remote object URL, doubling as the cache key.
    pub url: String,
}

/// Serve a file from cache. A miss schedules the fetch and answers 404; the
/// caller is expected to come back.
pub async fn get_file(
    State(manager): State<Arc<CacheManager>>,
    Query(params): Query<GetFileParams>,
) -> Response {
    match manager.read_through(&params.url) {
        Ok(Some(bytes)) => {
            let disposition = format!("attachment; filename=\"{}\"", file_name_of(&params.url));
            (
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!(url = %params.url, error = %e, "read-through failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Last path segment of the URL, for the download file name.
fn file_name_of(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("file")
}
