//! Core domain types for the funding-rate arbitrage and hedge engine.
//!
//! This crate provides the fundamental, venue-agnostic types used across
//! the workspace:
//! - `Rate`, `UsdAmount`, `Qty`: precision-safe decimal newtypes.
//! - `VenueId`, `Symbol`: canonical identifiers.
//! - `FundingObservation`, `MarketQuote`: market data.
//! - `HedgeKey`, `HedgeState`, `Hedge`: the hedge lifecycle state machine.
//! - `ExposureSnapshot`, `RiskParams`: risk-engine inputs.
//! - `Pnl`: daily/total PnL with a once-per-day reset latch.
//! - `Event`: the typed event set published on the event bus.
//! - `Clock`: an injectable wall-clock abstraction for deterministic tests.

pub mod alert;
pub mod clock;
pub mod decimal;
pub mod error;
pub mod events;
pub mod hedge;
pub mod ids;
pub mod market;
pub mod order;
pub mod pnl;
pub mod risk;

pub use alert::AlertLevel;
pub use clock::{Clock, FixedClock, SystemClock};
pub use decimal::{Qty, Rate, UsdAmount};
pub use error::{CoreError, Result};
pub use events::{Event, ExtremeEventKind};
pub use hedge::{CloseReason, Hedge, HedgeKey, HedgeState, PnlEstimate};
pub use ids::{Symbol, VenueId};
pub use market::{FundingObservation, MarketQuote};
pub use order::{OrderRef, OrderSide, PositionInfo, StreamEvent};
pub use pnl::Pnl;
pub use risk::{ExposureSnapshot, RiskParams};
