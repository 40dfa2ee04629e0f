use thiserror::Error;

use blobcache_catalog::CatalogError;
use blobcache_holder::HolderError;
use blobcache_types::TypeError;

/// Failure talking to the remote object store. Every variant is transient:
/// the permanent "object does not exist" answer is modeled as a successful
/// `head` returning `None`, not as an error.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request timed out: {0}")]
    Timeout(String),

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("transport error: {0}")]
    Transport(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("holder error: {0}")]
    Holder(#[from] HolderError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("token error: {0}")]
    Token(#[from] TypeError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;
