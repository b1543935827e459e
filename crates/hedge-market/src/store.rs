//! The in-memory, multi-venue market state store.
//!
//! A two-level `DashMap` nesting keyed first by venue, then by symbol,
//! since this engine aggregates several exchanges concurrently.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use hedge_core::{FundingObservation, MarketQuote, Symbol, VenueId};

const DEFAULT_HISTORY_CAP: usize = 200;

struct Row {
    latest_funding: Option<FundingObservation>,
    latest_quote: Option<MarketQuote>,
    history: VecDeque<FundingObservation>,
}

impl Row {
    fn new() -> Self {
        Self {
            latest_funding: None,
            latest_quote: None,
            history: VecDeque::new(),
        }
    }
}

type VenueRows = DashMap<Symbol, Arc<RwLock<Row>>>;

/// Write-through market state, single writer (the Aggregator), many readers.
///
/// Invariants, enforced by `ingest_funding`:
/// (a) timestamps in `history` are non-decreasing per (venue, symbol) in
///     the order they are ingested;
/// (b) the latest funding slot equals the most recently appended history
///     entry for that (venue, symbol);
/// (c) history never exceeds `history_cap` — oldest entry evicted first.
pub struct MarketStore {
    venues: DashMap<VenueId, VenueRows>,
    history_cap: usize,
}

impl MarketStore {
    #[must_use]
    pub fn new(history_cap: usize) -> Self {
        Self {
            venues: DashMap::new(),
            history_cap: history_cap.max(1),
        }
    }

    fn row(&self, venue: &VenueId, symbol: &Symbol) -> Arc<RwLock<Row>> {
        let venue_rows = self
            .venues
            .entry(venue.clone())
            .or_insert_with(DashMap::new);
        venue_rows
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(RwLock::new(Row::new())))
            .clone()
    }

    /// Overwrites the latest funding slot, appends to bounded history, and
    /// returns the previous latest value for dedup inspection by the caller.
    pub fn ingest_funding(&self, obs: FundingObservation) -> Option<FundingObservation> {
        let row = self.row(&obs.venue, &obs.symbol);
        let mut guard = row.write();
        let previous = guard.latest_funding.clone();

        guard.history.push_back(obs.clone());
        if guard.history.len() > self.history_cap {
            guard.history.pop_front();
        }
        guard.latest_funding = Some(obs);

        previous
    }

    pub fn ingest_quote(&self, venue: &VenueId, symbol: &Symbol, quote: MarketQuote) {
        let row = self.row(venue, symbol);
        row.write().latest_quote = Some(quote);
    }

    #[must_use]
    pub fn latest_funding(&self, venue: &VenueId, symbol: &Symbol) -> Option<FundingObservation> {
        let venue_rows = self.venues.get(venue)?;
        let row = venue_rows.get(symbol)?;
        row.read().latest_funding.clone()
    }

    #[must_use]
    pub fn latest_quote(&self, venue: &VenueId, symbol: &Symbol) -> Option<MarketQuote> {
        let venue_rows = self.venues.get(venue)?;
        let row = venue_rows.get(symbol)?;
        row.read().latest_quote
    }

    /// A point-in-time snapshot of the funding history for one (venue,
    /// symbol), oldest first.
    #[must_use]
    pub fn history(&self, venue: &VenueId, symbol: &Symbol) -> Vec<FundingObservation> {
        let Some(venue_rows) = self.venues.get(venue) else {
            return Vec::new();
        };
        let Some(row) = venue_rows.get(symbol) else {
            return Vec::new();
        };
        row.read().history.iter().cloned().collect()
    }

    /// Symbols for which `venue` currently has at least one funding
    /// observation.
    #[must_use]
    pub fn symbols_for_venue(&self, venue: &VenueId) -> Vec<Symbol> {
        self.venues
            .get(venue)
            .map(|rows| rows.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn venues(&self) -> Vec<VenueId> {
        self.venues.iter().map(|e| e.key().clone()).collect()
    }

    /// The set of symbols present across every venue currently in the
    /// store — the input to the arbitrage scan.
    #[must_use]
    pub fn common_symbols(&self) -> Vec<Symbol> {
        let venues = self.venues();
        if venues.len() < 2 {
            return Vec::new();
        }
        let mut iter = venues.iter();
        let first = iter.next().expect("len >= 2");
        let mut common: std::collections::BTreeSet<Symbol> =
            self.symbols_for_venue(first).into_iter().collect();
        for venue in iter {
            let these: std::collections::HashSet<Symbol> =
                self.symbols_for_venue(venue).into_iter().collect();
            common.retain(|s| these.contains(s));
        }
        common.into_iter().collect()
    }
}

impl Default for MarketStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hedge_core::Rate;
    use rust_decimal_macros::dec;

    fn obs(venue: &str, symbol: &str, rate: rust_decimal::Decimal) -> FundingObservation {
        let now = Utc::now();
        FundingObservation::new(
            VenueId::new(venue),
            Symbol::new(symbol),
            Rate::new(rate),
            now + chrono::Duration::hours(8),
            now,
        )
    }

    #[test]
    fn test_ingest_overwrites_latest_and_returns_previous() {
        let store = MarketStore::new(10);
        let first = obs("binance", "BTCUSDT", dec!(0.0005));
        let second = obs("binance", "BTCUSDT", dec!(0.0007));

        let prev = store.ingest_funding(first.clone());
        assert!(prev.is_none());

        let prev = store.ingest_funding(second.clone());
        assert_eq!(prev.unwrap().rate.inner(), dec!(0.0005));

        let latest = store
            .latest_funding(&VenueId::new("binance"), &Symbol::new("BTCUSDT"))
            .unwrap();
        assert_eq!(latest.rate.inner(), dec!(0.0007));
    }

    #[test]
    fn test_history_evicts_oldest_beyond_cap() {
        let store = MarketStore::new(3);
        let venue = VenueId::new("binance");
        let symbol = Symbol::new("BTCUSDT");
        for i in 0..5 {
            store.ingest_funding(obs("binance", "BTCUSDT", rust_decimal::Decimal::from(i)));
        }
        let history = store.history(&venue, &symbol);
        assert_eq!(history.len(), 3);
        // Oldest two (0, 1) evicted; remaining are 2, 3, 4 in insertion order.
        assert_eq!(history[0].rate.inner(), rust_decimal::Decimal::from(2));
        assert_eq!(history[2].rate.inner(), rust_decimal::Decimal::from(4));
    }

    #[test]
    fn test_latest_agrees_with_last_history_entry() {
        let store = MarketStore::new(10);
        let venue = VenueId::new("binance");
        let symbol = Symbol::new("BTCUSDT");
        for i in 0..4 {
            store.ingest_funding(obs("binance", "BTCUSDT", rust_decimal::Decimal::from(i)));
        }
        let latest = store.latest_funding(&venue, &symbol).unwrap();
        let history = store.history(&venue, &symbol);
        assert_eq!(latest.rate, history.last().unwrap().rate);
    }

    #[test]
    fn test_common_symbols_requires_two_venues() {
        let store = MarketStore::new(10);
        store.ingest_funding(obs("binance", "BTCUSDT", dec!(0.001)));
        assert!(store.common_symbols().is_empty());

        store.ingest_funding(obs("bybit", "BTCUSDT", dec!(0.002)));
        store.ingest_funding(obs("bybit", "ETHUSDT", dec!(0.001)));
        assert_eq!(store.common_symbols(), vec![Symbol::new("BTCUSDT")]);
    }
}
