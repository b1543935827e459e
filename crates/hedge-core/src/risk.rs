//! Portfolio exposure and risk-parameter types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::decimal::UsdAmount;
use crate::ids::Symbol;

/// A point-in-time view of portfolio-wide net exposure. Rebuilt on every
/// risk tick; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureSnapshot {
    pub net_value: UsdAmount,
    pub total_portfolio_value: UsdAmount,
    pub ratio: rust_decimal::Decimal,
    pub observed_at: DateTime<Utc>,
}

impl ExposureSnapshot {
    /// `ratio = net_value / total_value`, with the source's awaited-total
    /// bug fixed: a zero total yields ratio zero rather than a division
    /// panic or a stale/un-awaited read.
    #[must_use]
    pub fn compute(
        net_value: UsdAmount,
        total_portfolio_value: UsdAmount,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let ratio = if total_portfolio_value.is_zero() {
            rust_decimal::Decimal::ZERO
        } else {
            net_value.inner() / total_portfolio_value.inner()
        };
        Self {
            net_value,
            total_portfolio_value,
            ratio,
            observed_at,
        }
    }
}

/// Volatility (EWMA) and cross-symbol correlation used by the risk engine
/// and extreme-event detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskParams {
    pub volatility: f64,
    pub correlation: HashMap<Symbol, f64>,
}

impl RiskParams {
    /// `v' = 0.9 v + 0.1 v_instant`, per spec.
    pub fn update_volatility(&mut self, instant: f64) {
        self.volatility = 0.9 * self.volatility + 0.1 * instant;
    }
}
