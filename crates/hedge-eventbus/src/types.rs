//! Wire types for the operator status surface.

use serde::Serialize;

use hedge_core::{ExposureSnapshot, Hedge, Symbol, VenueId};

/// A point-in-time snapshot of the engine's state, served at `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub venues: Vec<VenueId>,
    pub symbols_tracked: Vec<Symbol>,
    pub active_hedges: Vec<Hedge>,
    pub exposure: ExposureSnapshot,
    pub emergency_stopped: bool,
}
