//! Optional history-preload collaborator.
//!
//! A `HistoryLoader` backs the Aggregator's startup preload of bounded
//! funding-rate history; failure to load is tolerated and the system
//! continues with an empty history for that (venue, symbol).

pub mod error;
pub mod loader;

pub use error::{PersistenceError, PersistenceResult};
pub use loader::{preload, HistoryLoader, RestHistoryLoader};
