//! Venue and symbol identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A venue identifier, e.g. `"binance"`, `"bybit"`.
///
/// Stored lowercase so lookups are case-insensitive regardless of how
/// configuration or an adapter happens to spell it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VenueId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A trading symbol in the engine's canonical form: exchange-native
/// uppercase, e.g. `"BTCUSDT"`. Adapters are responsible for normalizing
/// into this form; mapping tables live in configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_id_lowercases() {
        assert_eq!(VenueId::new("Binance").as_str(), "binance");
    }

    #[test]
    fn test_symbol_uppercases() {
        assert_eq!(Symbol::new("btcusdt").as_str(), "BTCUSDT");
    }

    #[test]
    fn test_venue_id_ordering_is_lexicographic() {
        // Tie-break on equal rates in the arbitrage scan depends on this.
        let a = VenueId::new("binance");
        let b = VenueId::new("bybit");
        assert!(a < b);
    }
}
