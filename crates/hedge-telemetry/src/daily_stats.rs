//! Daily PnL reporting, emitting the `DailyPnl` event.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::info;

use hedge_core::{Clock, Event, Pnl, UsdAmount};

/// Wraps the shared `Pnl` latch and periodically checks for the once-daily
/// reset, emitting `DailyPnl` whenever a reset actually fires so the
/// previous day's total is captured before it zeroes.
pub struct DailyStatsReporter {
    pnl: Arc<RwLock<Pnl>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<Event>,
}

impl DailyStatsReporter {
    #[must_use]
    pub fn new(pnl: Arc<RwLock<Pnl>>, clock: Arc<dyn Clock>, events: broadcast::Sender<Event>) -> Self {
        Self { pnl, clock, events }
    }

    /// Records a realized PnL delta against the running totals.
    pub fn record(&self, delta: UsdAmount) {
        self.pnl.write().record(delta);
    }

    /// Checks the reset latch; if this tick is the one that fires the
    /// reset, emits `DailyPnl` with the value the daily total held just
    /// before it zeroed.
    pub fn tick(&self) {
        let mut guard = self.pnl.write();
        let pre_reset = guard.daily;
        guard.maybe_reset_daily(self.clock.as_ref());
        if guard.daily.is_zero() && !pre_reset.is_zero() {
            info!(value = %pre_reset, "daily pnl reset");
            let _ = self.events.send(Event::DailyPnl {
                value: pre_reset,
                ts: Utc::now(),
            });
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Pnl {
        self.pnl.read().clone()
    }
}

/// A per-(venue, symbol) daily statistics line, useful for an operator
/// summary log distinct from the aggregate `DailyPnl` event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketDailyStats {
    pub observation_count: u64,
    pub alert_count: u64,
}

impl MarketDailyStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            observation_count: 0,
            alert_count: 0,
        }
    }

    pub fn record_observation(&mut self) {
        self.observation_count += 1;
    }

    pub fn record_alert(&mut self) {
        self.alert_count += 1;
    }
}

impl Default for MarketDailyStats {
    fn default() -> Self {
        Self::new()
    }
}
