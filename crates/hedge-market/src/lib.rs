//! Multi-venue funding-rate and mark-price store, plus the poller that
//! keeps it fresh.
//!
//! `MarketStore` holds the data across many concurrent venues; `Aggregator`
//! drives periodic collection across every registered adapter.

pub mod aggregator;
pub mod error;
pub mod store;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use error::{MarketError, MarketResult};
pub use store::MarketStore;
