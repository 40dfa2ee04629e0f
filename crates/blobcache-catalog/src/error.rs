use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
