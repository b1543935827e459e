//! Operator-facing status and event-bus HTTP surface.
//!
//! `DashboardState` aggregates read-only views over the Market Store, the
//! Hedge Tracker, and the Risk Engine's latest exposure snapshot; `run_server`
//! exposes them over `GET /status` (JSON) and `GET /events` (server-sent
//! events mirroring the typed event bus).

pub mod config;
pub mod server;
pub mod state;
pub mod types;

pub use config::DashboardConfig;
pub use server::{router, run_server};
pub use state::DashboardState;
pub use types::StatusSnapshot;
