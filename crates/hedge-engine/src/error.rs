//! Hedge Lifecycle Manager error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("insufficient funds for hedge open")]
    InsufficientFunds,

    #[error("unknown venue: {0}")]
    UnknownVenue(String),

    #[error("venue adapter error: {0}")]
    Adapter(#[from] hedge_venue::AdapterError),

    #[error(transparent)]
    Position(#[from] hedge_position::PositionError),
}

pub type EngineResult<T> = Result<T, EngineError>;
