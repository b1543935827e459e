//! Prometheus metrics and structured logging for the funding-rate
//! arbitrage engine.
//!
//! Provides observability from Day 1:
//! - Prometheus metrics for arbitrage opportunities, hedge transitions, risk gates
//! - Structured JSON logging with tracing
//! - Daily PnL reporting

pub mod daily_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use daily_stats::{DailyStatsReporter, MarketDailyStats};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
