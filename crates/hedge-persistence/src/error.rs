//! History-loader error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response decode error: {0}")]
    Decode(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
