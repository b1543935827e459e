//! Multi-venue funding-rate arbitrage and hedge engine.
//!
//! Wires the Market Store and Aggregator (`hedge-market`), the Alert &
//! Opportunity Detector (`hedge-detector`), the Hedge Lifecycle Manager
//! (`hedge-engine`), the Risk Engine (`hedge-risk`), the Rebalancer
//! (`hedge-rebalancer`), and the operator status/event surface
//! (`hedge-eventbus`) behind one `Engine` (`start_hedging`, `stop_hedging`,
//! `emergency_shutdown`, `status`).

pub mod config;
pub mod engine;
pub mod error;

pub use config::AppConfig;
pub use engine::Engine;
pub use error::{AppError, AppResult};
