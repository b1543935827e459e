//! Top-level application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("detector error: {0}")]
    Detector(#[from] hedge_detector::DetectorError),

    #[error("market error: {0}")]
    Market(#[from] hedge_market::MarketError),

    #[error("engine error: {0}")]
    Engine(#[from] hedge_engine::EngineError),

    #[error("risk error: {0}")]
    Risk(#[from] hedge_risk::RiskError),

    #[error("persistence error: {0}")]
    Persistence(#[from] hedge_persistence::PersistenceError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] hedge_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
