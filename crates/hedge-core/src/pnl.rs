//! Daily/total PnL tracking with a once-per-day reset latch.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::decimal::UsdAmount;

/// Daily and running-total PnL. `daily` resets to zero exactly once per
/// calendar day, the first time `maybe_reset_daily` observes a timestamp in
/// the first 10 minutes of a day it hasn't reset for yet — see DESIGN.md
/// for the "local day" interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pnl {
    pub daily: UsdAmount,
    pub total: UsdAmount,
    last_reset_date: Option<NaiveDate>,
}

impl Default for Pnl {
    fn default() -> Self {
        Self {
            daily: UsdAmount::ZERO,
            total: UsdAmount::ZERO,
            last_reset_date: None,
        }
    }
}

impl Pnl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, delta: UsdAmount) {
        self.daily = self.daily + delta;
        self.total = self.total + delta;
    }

    /// Reset `daily` to zero if `clock` is within the first 10 minutes of a
    /// day this instance hasn't already reset for. Idempotent within that
    /// window: calling it repeatedly during the same 10-minute slice resets
    /// at most once.
    pub fn maybe_reset_daily(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        if self.should_reset(now) {
            self.daily = UsdAmount::ZERO;
            self.last_reset_date = Some(now.date_naive());
        }
    }

    fn should_reset(&self, now: DateTime<Utc>) -> bool {
        if now.hour() != 0 || now.minute() >= 10 {
            return false;
        }
        self.last_reset_date != Some(now.date_naive())
    }
}
