//! Rebalancer configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_threshold() -> Decimal {
    dec!(0.03)
}
fn default_interval_secs() -> u64 {
    300
}
/// Default settlement asset transferred between venues.
fn default_asset() -> String {
    "USDC".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancerConfig {
    /// A venue is a donor/needy candidate once `|bal - avg| / total > rebalance_threshold`.
    #[serde(default = "default_threshold")]
    pub rebalance_threshold: Decimal,
    /// Rebalance sweep cadence, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_asset")]
    pub asset: String,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            rebalance_threshold: default_threshold(),
            interval_secs: default_interval_secs(),
            asset: default_asset(),
        }
    }
}

impl RebalancerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
