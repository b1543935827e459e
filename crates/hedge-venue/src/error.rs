//! Venue adapter error types.

use thiserror::Error;

/// The fixed error vocabulary every venue adapter operation fails into.
/// Adapters never panic the process; every error surfaces through this
/// enum instead.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("bad symbol: {0}")]
    BadSymbol(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("exchange error {code}: {msg}")]
    Exchange { code: String, msg: String },

    #[error("internal adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Read-path and reconnect failures are retried; a few categories never
    /// are (bad credentials, unsupported operations).
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
