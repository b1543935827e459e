//! Risk engine configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_exposure() -> Decimal {
    dec!(0.10)
}
fn default_tick_secs() -> u64 {
    10
}
/// De-risk stops once `|ratio|` falls to this fraction of `max_exposure`.
fn default_derisk_target_fraction() -> Decimal {
    dec!(0.8)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Ceiling on `|net_value / total_value|` before de-risk triggers.
    #[serde(default = "default_max_exposure")]
    pub max_exposure: Decimal,
    /// Risk tick cadence, in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_interval_secs: u64,
    /// De-risk reduces exposure until `|ratio| <= derisk_target_fraction * max_exposure`.
    #[serde(default = "default_derisk_target_fraction")]
    pub derisk_target_fraction: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_exposure: default_max_exposure(),
            tick_interval_secs: default_tick_secs(),
            derisk_target_fraction: default_derisk_target_fraction(),
        }
    }
}

impl RiskConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}
