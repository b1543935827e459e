//! Portfolio-wide exposure tracking, de-risk, and emergency shutdown.
//!
//! Periodically polls every venue's positions and balances, recomputes
//! net exposure, and reduces the worst-PnL positions first when the
//! exposure ceiling is breached. Emergency shutdown is a one-shot,
//! best-effort flatten of every venue that also gates the Hedge Lifecycle
//! Manager from opening new hedges.

pub mod config;
pub mod engine;
pub mod error;

pub use config::RiskConfig;
pub use engine::{FlatPosition, RiskEngine};
pub use error::{RiskError, RiskResult};
