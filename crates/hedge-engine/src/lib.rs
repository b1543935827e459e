//! The Hedge Lifecycle Manager: idempotent open / monitor / close of
//! delta-neutral cross-venue hedge pairs.

pub mod config;
pub mod error;
pub mod manager;
pub mod pnl;

pub use config::{EngineConfig, LegSizing};
pub use error::{EngineError, EngineResult};
pub use manager::HedgeManager;
