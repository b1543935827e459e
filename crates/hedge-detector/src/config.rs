//! Detector thresholds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use hedge_core::Rate;

use crate::error::{DetectorError, DetectorResult};

fn default_warning() -> Decimal {
    dec!(0.0005)
}
fn default_critical() -> Decimal {
    dec!(0.001)
}
fn default_arbitrage() -> Decimal {
    dec!(0.002)
}
fn default_extreme_window() -> usize {
    20
}
fn default_surge_threshold() -> Decimal {
    dec!(0.05)
}
fn default_liquidity_drop_ratio() -> Decimal {
    dec!(0.30)
}
fn default_volatility_spike_multiple() -> Decimal {
    dec!(3)
}

/// Threshold and extreme-event tuning for the detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Absolute funding-rate magnitude that emits `Alert{level=warning}`.
    #[serde(default = "default_warning")]
    pub warning: Decimal,
    /// Absolute funding-rate magnitude that emits `Alert{level=critical}`.
    #[serde(default = "default_critical")]
    pub critical: Decimal,
    /// Cross-venue funding spread above which an arbitrage opportunity opens.
    #[serde(default = "default_arbitrage")]
    pub arbitrage: Decimal,
    /// Rolling window (in ticks) used for extreme-event statistics.
    #[serde(default = "default_extreme_window")]
    pub extreme_event_window: usize,
    /// Single-interval return magnitude that flags `price_surge`/`price_crash`.
    #[serde(default = "default_surge_threshold")]
    pub surge_threshold: Decimal,
    /// Latest volume below this fraction of the window mean flags `liquidity_drop`.
    #[serde(default = "default_liquidity_drop_ratio")]
    pub liquidity_drop_ratio: Decimal,
    /// Instantaneous realized vol above this multiple of the window-mean vol
    /// flags `volatility_spike`.
    #[serde(default = "default_volatility_spike_multiple")]
    pub volatility_spike_multiple: Decimal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            warning: default_warning(),
            critical: default_critical(),
            arbitrage: default_arbitrage(),
            extreme_event_window: default_extreme_window(),
            surge_threshold: default_surge_threshold(),
            liquidity_drop_ratio: default_liquidity_drop_ratio(),
            volatility_spike_multiple: default_volatility_spike_multiple(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> DetectorResult<()> {
        if self.warning <= Decimal::ZERO
            || self.critical <= self.warning
            || self.arbitrage <= Decimal::ZERO
        {
            return Err(DetectorError::Config(
                "thresholds must satisfy 0 < warning < critical and arbitrage > 0".into(),
            ));
        }
        if self.extreme_event_window < 2 {
            return Err(DetectorError::Config(
                "extreme_event_window must be at least 2".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn warning_rate(&self) -> Rate {
        Rate::new(self.warning)
    }

    #[must_use]
    pub fn critical_rate(&self) -> Rate {
        Rate::new(self.critical)
    }

    #[must_use]
    pub fn arbitrage_rate(&self) -> Rate {
        Rate::new(self.arbitrage)
    }
}
