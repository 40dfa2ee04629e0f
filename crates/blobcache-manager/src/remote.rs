//! Boundary to the remote object store the cache fronts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RemoteError, RemoteResult};

/// Read-only view of the remote object store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Size of the remote object. `Ok(None)` means the object permanently
    /// does not exist; errors are transient and worth retrying.
    async fn head(&self, url: &str) -> RemoteResult<Option<u64>>;

    /// Full body of the remote object.
    async fn fetch(&self, url: &str) -> RemoteResult<Vec<u8>>;
}

/// HTTP-backed remote store with one bounded timeout per request.
pub struct HttpRemoteStore {
    client: reqwest::Client,
}

impl HttpRemoteStore {
    pub fn new(timeout: Duration) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    fn map_err(url: &str, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(url.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn head(&self, url: &str) -> RemoteResult<Option<u64>> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Self::map_err(url, e))?;
        match resp.status().as_u16() {
            200 => Ok(Some(resp.content_length().unwrap_or(0))),
            404 => Ok(None),
            status => Err(RemoteError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    async fn fetch(&self, url: &str) -> RemoteResult<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_err(url, e))?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status,
            });
        }
        let bytes = resp.bytes().await.map_err(|e| Self::map_err(url, e))?;
        debug!(url, size = bytes.len(), "fetched remote object");
        Ok(bytes.to_vec())
    }
}

/// Map-backed remote store for tests, with transient-failure injection.
pub struct InMemoryRemoteStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    failures: AtomicUsize,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(url.into(), body.into());
    }

    /// Fail the next `n` requests with a transient error.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    fn maybe_fail(&self, url: &str) -> RemoteResult<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::Timeout(url.to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn head(&self, url: &str) -> RemoteResult<Option<u64>> {
        self.maybe_fail(url)?;
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .get(url)
            .map(|body| body.len() as u64))
    }

    async fn fetch(&self, url: &str) -> RemoteResult<Vec<u8>> {
        self.maybe_fail(url)?;
        self.objects
            .read()
            .expect("lock poisoned")
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn head_distinguishes_absence_from_failure() {
        let store = InMemoryRemoteStore::new();
        store.insert("http://oss/a", b"abc".to_vec());

        assert_eq!(store.head("http://oss/a").await.unwrap(), Some(3));
        assert_eq!(store.head("http://oss/missing").await.unwrap(), None);

        store.fail_next(1);
        assert!(matches!(
            store.head("http://oss/a").await,
            Err(RemoteError::Timeout(_))
        ));
        // failure budget exhausted, next call succeeds
        assert_eq!(store.head("http://oss/a").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn fetch_returns_body_or_status() {
        let store = InMemoryRemoteStore::new();
        store.insert("http://oss/a", b"abc".to_vec());

        assert_eq!(store.fetch("http://oss/a").await.unwrap(), b"abc");
        assert!(matches!(
            store.fetch("http://oss/missing").await,
            Err(RemoteError::Status { status: 404, .. })
        ));
    }
}
