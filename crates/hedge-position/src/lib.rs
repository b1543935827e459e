//! Concurrent hedge-state tracking.
//!
//! Holds the authoritative `Hedge` record per `HedgeKey`, and the atomic
//! check-and-insert that makes opening a hedge idempotent under concurrent
//! arbitrage re-evaluation.

pub mod error;
pub mod tracker;

pub use error::{PositionError, PositionResult};
pub use tracker::{HedgeTracker, OpenOutcome};
