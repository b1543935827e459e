//! The typed event set published on the engine's event bus.
//!
//! A tagged union over a single publish-subscribe channel, replacing the
//! string-keyed emitter pattern of the source with an explicit, exhaustively
//! matchable enum — every subscriber sees one closed set of variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::AlertLevel;
use crate::decimal::{Rate, UsdAmount};
use crate::hedge::{CloseReason, HedgeKey, HedgeState};
use crate::ids::{Symbol, VenueId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Alert {
        level: AlertLevel,
        venue: VenueId,
        symbol: Symbol,
        rate: Rate,
        message: String,
        ts: DateTime<Utc>,
    },
    Arbitrage {
        symbol: Symbol,
        long_venue: VenueId,
        short_venue: VenueId,
        long_rate: Rate,
        short_rate: Rate,
        spread: Rate,
        ts: DateTime<Utc>,
    },
    ExtremeEvent {
        kind: ExtremeEventKind,
        symbol: Symbol,
        value: f64,
        ts: DateTime<Utc>,
    },
    HedgeOpened {
        key: HedgeKey,
        size: crate::decimal::Qty,
        ts: DateTime<Utc>,
    },
    HedgeClosed {
        key: HedgeKey,
        reason: CloseReason,
        realized_pnl: UsdAmount,
        ts: DateTime<Utc>,
    },
    HedgeFailed {
        key: HedgeKey,
        partial_fill: bool,
        ts: DateTime<Utc>,
    },
    HedgeCloseFailed {
        key: HedgeKey,
        ts: DateTime<Utc>,
    },
    RiskExceeded {
        exposure: rust_decimal::Decimal,
        ts: DateTime<Utc>,
    },
    StateChange {
        key: HedgeKey,
        from: HedgeState,
        to: HedgeState,
        ts: DateTime<Utc>,
    },
    DailyPnl {
        value: UsdAmount,
        ts: DateTime<Utc>,
    },
    EmergencyShutdown {
        ts: DateTime<Utc>,
    },
    FetchFailed {
        venue: VenueId,
        error: String,
        ts: DateTime<Utc>,
    },
    RebalanceTransfer {
        from_venue: VenueId,
        to_venue: VenueId,
        amount: UsdAmount,
        ts: DateTime<Utc>,
    },
}

/// Kind of extreme market event detected from the mark-price/volume stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremeEventKind {
    PriceSurge,
    PriceCrash,
    LiquidityDrop,
    VolatilitySpike,
}
