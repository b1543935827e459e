//! Hedge Lifecycle Manager configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Whether both legs share one USD notional (and therefore different
/// quantities when mark prices differ) or one common quantity (and
/// therefore different notionals). `EqualNotional` matches the source's
/// formulation; `EqualQty` is the true delta-neutral alternative, offered
/// for venues where contract multipliers make equal notionals non-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegSizing {
    EqualNotional,
    EqualQty,
}

fn default_leg_sizing() -> LegSizing {
    LegSizing::EqualNotional
}
fn default_leg_size_fraction() -> Decimal {
    dec!(0.5)
}
fn default_take_profit() -> Decimal {
    dec!(0.10)
}
fn default_stop_loss() -> Decimal {
    dec!(0.05)
}
fn default_warning_threshold() -> Decimal {
    dec!(0.0005)
}
fn default_max_close_retries() -> u32 {
    3
}
fn default_monitor_interval_secs() -> u64 {
    10
}
fn default_auto_hedge() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master switch; hedges are never opened while this is `false`.
    #[serde(default = "default_auto_hedge")]
    pub auto_hedge: bool,
    #[serde(default = "default_leg_sizing")]
    pub leg_sizing: LegSizing,
    /// Fraction of `min(long_avail, short_avail)` committed per leg.
    #[serde(default = "default_leg_size_fraction")]
    pub leg_size_fraction: Decimal,
    /// Close with `take_profit` once `ratio_change >= take_profit * 0.5`.
    #[serde(default = "default_take_profit")]
    pub take_profit: Decimal,
    #[serde(default = "default_stop_loss")]
    pub stop_loss: Decimal,
    /// Funding-spread-collapse close trigger; kept in sync with the
    /// detector's warning threshold by the top-level wiring layer.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: Decimal,
    #[serde(default = "default_max_close_retries")]
    pub max_close_retries: u32,
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_hedge: default_auto_hedge(),
            leg_sizing: default_leg_sizing(),
            leg_size_fraction: default_leg_size_fraction(),
            take_profit: default_take_profit(),
            stop_loss: default_stop_loss(),
            warning_threshold: default_warning_threshold(),
            max_close_retries: default_max_close_retries(),
            monitor_interval_secs: default_monitor_interval_secs(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.leg_size_fraction <= Decimal::ZERO || self.leg_size_fraction > Decimal::ONE {
            return Err(EngineError::Config(
                "leg_size_fraction must be in (0, 1]".into(),
            ));
        }
        if self.take_profit <= Decimal::ZERO || self.stop_loss <= Decimal::ZERO {
            return Err(EngineError::Config(
                "take_profit and stop_loss must be positive".into(),
            ));
        }
        if self.max_close_retries == 0 {
            return Err(EngineError::Config("max_close_retries must be > 0".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.leg_size_fraction, dec!(0.5));
        assert_eq!(config.take_profit, dec!(0.10));
        assert_eq!(config.stop_loss, dec!(0.05));
        assert!(!config.auto_hedge);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_fraction() {
        let mut config = EngineConfig::default();
        config.leg_size_fraction = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
