//! Risk engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("venue adapter error: {0}")]
    Adapter(#[from] hedge_venue::AdapterError),
}

pub type RiskResult<T> = Result<T, RiskError>;
