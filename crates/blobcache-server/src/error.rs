use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("manager error: {0}")]
    Manager(#[from] blobcache_manager::ManagerError),

    #[error("holder error: {0}")]
    Holder(#[from] blobcache_holder::HolderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
