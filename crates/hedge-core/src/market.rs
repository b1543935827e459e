//! Market data types: funding-rate observations and mark-price quotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::ids::{Symbol, VenueId};

/// A single funding-rate reading for a (venue, symbol) pair.
///
/// Immutable once created — history is a sequence of these, never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingObservation {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub rate: Rate,
    pub next_funding_time: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

impl FundingObservation {
    #[must_use]
    pub fn new(
        venue: VenueId,
        symbol: Symbol,
        rate: Rate,
        next_funding_time: DateTime<Utc>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            venue,
            symbol,
            rate,
            next_funding_time,
            observed_at,
        }
    }
}

/// The latest mark price for a (venue, symbol) pair. Mutable: each new
/// quote replaces the previous one in the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub mark_price: rust_decimal::Decimal,
    pub observed_at: DateTime<Utc>,
}

impl MarketQuote {
    #[must_use]
    pub fn new(mark_price: rust_decimal::Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            mark_price,
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_funding_observation_construction() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let obs = FundingObservation::new(
            VenueId::new("binance"),
            Symbol::new("btcusdt"),
            Rate::new(dec!(0.0006)),
            now + chrono::Duration::hours(8),
            now,
        );
        assert_eq!(obs.venue.as_str(), "binance");
        assert_eq!(obs.symbol.as_str(), "BTCUSDT");
        assert_eq!(obs.rate.inner(), dec!(0.0006));
    }
}
