//! Aggregates read-only views over the engine's shared state for the
//! operator status/SSE surface.

use std::sync::Arc;

use tokio::sync::broadcast;

use hedge_core::Event;
use hedge_market::MarketStore;
use hedge_position::HedgeTracker;
use hedge_risk::RiskEngine;

use crate::types::StatusSnapshot;

#[derive(Clone)]
pub struct DashboardState {
    market: Arc<MarketStore>,
    hedges: Arc<HedgeTracker>,
    risk: Arc<RiskEngine>,
    events: broadcast::Sender<Event>,
}

impl DashboardState {
    #[must_use]
    pub fn new(
        market: Arc<MarketStore>,
        hedges: Arc<HedgeTracker>,
        risk: Arc<RiskEngine>,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            market,
            hedges,
            risk,
            events,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            venues: self.market.venues(),
            symbols_tracked: self.market.common_symbols(),
            active_hedges: self.hedges.active(),
            exposure: self.risk.latest_exposure(),
            emergency_stopped: self.risk.is_emergency_stopped(),
        }
    }

    /// A new subscription to the event bus, for the `/events` SSE stream.
    /// Each subscriber gets its own bounded queue; a slow reader drops the
    /// oldest non-critical events rather than blocking publishers (spec
    /// §5).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}
