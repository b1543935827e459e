//! The hedge state machine and its record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Qty, UsdAmount};
use crate::ids::{Symbol, VenueId};
use crate::order::OrderRef;

/// Deterministic, idempotency-bearing identifier for a hedge: the
/// `symbol|long_venue|short_venue` triple. Two opportunities that resolve
/// to the same key can never both result in an open.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HedgeKey {
    pub symbol: Symbol,
    pub long_venue: VenueId,
    pub short_venue: VenueId,
}

impl HedgeKey {
    #[must_use]
    pub fn new(symbol: Symbol, long_venue: VenueId, short_venue: VenueId) -> Self {
        Self {
            symbol,
            long_venue,
            short_venue,
        }
    }
}

impl std::fmt::Display for HedgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.symbol, self.long_venue, self.short_venue
        )
    }
}

/// Why an `Active` hedge transitioned to `Closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    TakeProfit,
    StopLoss,
    SpreadCollapsed,
    Emergency,
}

/// States of a hedge's lifecycle. `Closed`, `Failed` and `CloseFailed` are
/// terminal — a hedge record is never reused or resurrected once it lands
/// in one of these; the key stays in the store for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeState {
    Opening,
    Active,
    Closing,
    Closed,
    Failed,
    CloseFailed,
}

impl HedgeState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed | Self::CloseFailed)
    }
}

/// A dual PnL estimate for an active or closed hedge: mark-to-market and
/// the funding-rate differential captured while the position was open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlEstimate {
    pub mark_to_market: UsdAmount,
    pub funding_delta: UsdAmount,
}

/// A single delta-neutral long/short hedge position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hedge {
    pub key: HedgeKey,
    pub state: HedgeState,
    pub size: Qty,
    pub entry_long_price: rust_decimal::Decimal,
    pub entry_short_price: rust_decimal::Decimal,
    pub entry_spread_ratio: rust_decimal::Decimal,
    pub long_order_ref: Option<OrderRef>,
    pub short_order_ref: Option<OrderRef>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub close_reason: Option<CloseReason>,
    pub realized_pnl: Option<UsdAmount>,
}

impl Hedge {
    #[must_use]
    pub fn opening(
        key: HedgeKey,
        entry_long_price: rust_decimal::Decimal,
        entry_short_price: rust_decimal::Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let entry_spread_ratio = (entry_short_price - entry_long_price) / entry_long_price;
        Self {
            key,
            state: HedgeState::Opening,
            size: Qty::ZERO,
            entry_long_price,
            entry_short_price,
            entry_spread_ratio,
            long_order_ref: None,
            short_order_ref: None,
            opened_at,
            closed_at: None,
            close_reason: None,
            realized_pnl: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key() -> HedgeKey {
        HedgeKey::new(
            Symbol::new("BTCUSDT"),
            VenueId::new("binance"),
            VenueId::new("bybit"),
        )
    }

    #[test]
    fn test_hedge_key_display() {
        assert_eq!(key().to_string(), "BTCUSDT|binance|bybit");
    }

    #[test]
    fn test_hedge_state_terminal() {
        assert!(HedgeState::Closed.is_terminal());
        assert!(HedgeState::Failed.is_terminal());
        assert!(HedgeState::CloseFailed.is_terminal());
        assert!(!HedgeState::Active.is_terminal());
        assert!(!HedgeState::Opening.is_terminal());
        assert!(!HedgeState::Closing.is_terminal());
    }

    #[test]
    fn test_opening_computes_entry_spread_ratio() {
        let now = Utc::now();
        let hedge = Hedge::opening(key(), dec!(50000), dec!(50100), now);
        assert_eq!(hedge.entry_spread_ratio, dec!(0.002));
        assert_eq!(hedge.state, HedgeState::Opening);
    }
}
