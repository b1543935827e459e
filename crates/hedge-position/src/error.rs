//! Hedge tracker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("hedge not found: {0}")]
    NotFound(String),

    #[error("invalid hedge state transition on {key}: {from:?} -> {to:?}")]
    InvalidTransition {
        key: String,
        from: hedge_core::HedgeState,
        to: hedge_core::HedgeState,
    },
}

pub type PositionResult<T> = Result<T, PositionError>;
