//! Market store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("venue/symbol not found: {0}/{1}")]
    NotFound(String, String),

    #[error("invalid history cap: {0}")]
    InvalidHistoryCap(usize),
}

pub type MarketResult<T> = std::result::Result<T, MarketError>;
