use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("malformed blob token: {0}")]
    MalformedToken(String),
}
