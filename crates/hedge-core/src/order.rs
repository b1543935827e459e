//! Order and position types shared by venue adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Qty, UsdAmount};
use crate::ids::Symbol;

/// Side of an order or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened with this side.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// `+1` for `Buy`/long, `-1` for `Sell`/short — used in exposure math.
    #[must_use]
    pub fn sign(&self) -> rust_decimal::Decimal {
        match self {
            Self::Buy => rust_decimal::Decimal::ONE,
            Self::Sell => -rust_decimal::Decimal::ONE,
        }
    }
}

/// Reference to a completed order, returned by `create_market_order` and
/// `close_position`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub executed_qty: Qty,
    pub avg_price: rust_decimal::Decimal,
}

/// A venue's view of a single open position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub side: OrderSide,
    pub size: Qty,
    pub entry_price: rust_decimal::Decimal,
    pub mark_price: rust_decimal::Decimal,
    pub unrealized_pnl: UsdAmount,
}

impl PositionInfo {
    /// Signed notional value, long positive / short negative.
    #[must_use]
    pub fn signed_value(&self) -> UsdAmount {
        UsdAmount(self.side.sign() * self.size.inner() * self.mark_price)
    }
}

/// A push-based update delivered by a venue's `subscribe_stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    Funding {
        symbol: Symbol,
        rate: crate::decimal::Rate,
        next_funding_time: DateTime<Utc>,
        observed_at: DateTime<Utc>,
    },
    Ticker {
        symbol: Symbol,
        mark_price: rust_decimal::Decimal,
        /// Rolling traded volume in the base asset over the adapter's own
        /// sampling window; used by extreme-event liquidity-drop detection.
        volume: rust_decimal::Decimal,
        observed_at: DateTime<Utc>,
    },
    Position {
        symbol: Symbol,
        info: PositionInfo,
        observed_at: DateTime<Utc>,
    },
}
