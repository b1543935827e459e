//! Error types for hedge-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid rate: {0}")]
    InvalidRate(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid hedge key: {0}")]
    InvalidHedgeKey(String),

    #[error("decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
