//! Per-(venue, symbol) alert counters.

use dashmap::DashMap;

use hedge_core::{Symbol, VenueId};

/// Tracks consecutive warning-or-above observations per (venue, symbol).
/// Reset to zero on any observation whose absolute rate is at or below the
/// warning threshold.
#[derive(Default)]
pub struct AlertCounter {
    counts: DashMap<(VenueId, Symbol), u64>,
}

impl AlertCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation above warning, returning the counter's new value.
    pub fn increment(&self, venue: &VenueId, symbol: &Symbol) -> u64 {
        let mut entry = self
            .counts
            .entry((venue.clone(), symbol.clone()))
            .or_insert(0);
        *entry += 1;
        *entry
    }

    /// Resets the counter for (venue, symbol) to zero.
    pub fn reset(&self, venue: &VenueId, symbol: &Symbol) {
        self.counts.insert((venue.clone(), symbol.clone()), 0);
    }

    #[must_use]
    pub fn get(&self, venue: &VenueId, symbol: &Symbol) -> u64 {
        self.counts
            .get(&(venue.clone(), symbol.clone()))
            .map(|v| *v)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_then_reset() {
        let counter = AlertCounter::new();
        let venue = VenueId::new("binance");
        let symbol = Symbol::new("BTCUSDT");

        assert_eq!(counter.increment(&venue, &symbol), 1);
        assert_eq!(counter.increment(&venue, &symbol), 2);
        counter.reset(&venue, &symbol);
        assert_eq!(counter.get(&venue, &symbol), 0);
    }

    #[test]
    fn test_counters_are_independent_per_key() {
        let counter = AlertCounter::new();
        counter.increment(&VenueId::new("binance"), &Symbol::new("BTCUSDT"));
        assert_eq!(counter.get(&VenueId::new("bybit"), &Symbol::new("BTCUSDT")), 0);
    }
}
