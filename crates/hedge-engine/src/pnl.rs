//! Dual PnL estimation for active and closed hedges.

use rust_decimal::Decimal;

use hedge_core::{Hedge, PnlEstimate, Qty, Rate, UsdAmount};

/// Mark-to-market estimate: `(long_now - long_entry + short_entry - short_now) * size`.
#[must_use]
pub fn mark_to_market(hedge: &Hedge, long_price_now: Decimal, short_price_now: Decimal) -> UsdAmount {
    let delta = long_price_now - hedge.entry_long_price + hedge.entry_short_price - short_price_now;
    UsdAmount::new(delta * hedge.size.inner())
}

/// Funding-rate differential captured over the hedge's lifetime so far:
/// `(avg_short_funding - avg_long_funding) * qty * duration_hours`.
#[must_use]
pub fn funding_delta(
    size: Qty,
    avg_long_funding: Rate,
    avg_short_funding: Rate,
    duration_hours: Decimal,
) -> UsdAmount {
    let rate_diff = avg_short_funding.inner() - avg_long_funding.inner();
    UsdAmount::new(rate_diff * size.inner() * duration_hours)
}

#[must_use]
pub fn estimate(
    hedge: &Hedge,
    long_price_now: Decimal,
    short_price_now: Decimal,
    avg_long_funding: Rate,
    avg_short_funding: Rate,
    duration_hours: Decimal,
) -> PnlEstimate {
    PnlEstimate {
        mark_to_market: mark_to_market(hedge, long_price_now, short_price_now),
        funding_delta: funding_delta(hedge.size, avg_long_funding, avg_short_funding, duration_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hedge_core::{HedgeKey, Symbol, VenueId};
    use rust_decimal_macros::dec;

    fn hedge() -> Hedge {
        let mut h = Hedge::opening(
            HedgeKey::new(Symbol::new("BTCUSDT"), VenueId::new("x"), VenueId::new("y")),
            dec!(50000),
            dec!(50100),
            Utc::now(),
        );
        h.size = Qty::new(dec!(0.01));
        h
    }

    #[test]
    fn test_mark_to_market_profit_when_spread_widens() {
        let h = hedge();
        let pnl = mark_to_market(&h, dec!(50000), dec!(50300));
        assert_eq!(pnl.inner(), dec!(-2));
    }

    #[test]
    fn test_funding_delta() {
        let delta = funding_delta(Qty::new(dec!(1)), Rate::new(dec!(-0.001)), Rate::new(dec!(0.0015)), dec!(24));
        assert_eq!(delta.inner(), dec!(0.06));
    }
}
