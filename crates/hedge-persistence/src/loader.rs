//! Optional startup history preload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use hedge_core::{FundingObservation, Rate, Symbol, VenueId};

use crate::error::PersistenceResult;

/// A source of bounded funding-rate history for a (venue, symbol) pair,
/// used to preload the Market Store at startup.
#[async_trait]
pub trait HistoryLoader: Send + Sync {
    async fn load_history(
        &self,
        venue: &VenueId,
        symbol: &Symbol,
        since: DateTime<Utc>,
    ) -> PersistenceResult<Vec<FundingObservation>>;
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    venue: String,
    symbol: String,
    rate: rust_decimal::Decimal,
    timestamp: DateTime<Utc>,
    next_time: DateTime<Utc>,
}

/// Loads history from a REST endpoint returning
/// `[{venue, symbol, rate, timestamp, next_time}, ...]`.
pub struct RestHistoryLoader {
    client: reqwest::Client,
    base_url: String,
}

impl RestHistoryLoader {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HistoryLoader for RestHistoryLoader {
    async fn load_history(
        &self,
        venue: &VenueId,
        symbol: &Symbol,
        since: DateTime<Utc>,
    ) -> PersistenceResult<Vec<FundingObservation>> {
        let url = format!(
            "{}/history?venue={}&symbol={}&since={}",
            self.base_url,
            venue,
            symbol,
            since.to_rfc3339()
        );
        let entries: Vec<HistoryEntry> = self.client.get(&url).send().await?.json().await?;
        Ok(entries
            .into_iter()
            .map(|e| {
                FundingObservation::new(
                    VenueId::new(e.venue),
                    Symbol::new(e.symbol),
                    Rate::new(e.rate),
                    e.next_time,
                    e.timestamp,
                )
            })
            .collect())
    }
}

/// Preloads history for a (venue, symbol) pair, tolerating failure: a
/// failed preload logs and the system continues with empty history.
pub async fn preload(
    loader: &dyn HistoryLoader,
    venue: &VenueId,
    symbol: &Symbol,
    since: DateTime<Utc>,
) -> Vec<FundingObservation> {
    match loader.load_history(venue, symbol, since).await {
        Ok(history) => history,
        Err(err) => {
            warn!(%venue, %symbol, %err, "history preload failed, continuing with empty history");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingLoader {
        called: AtomicBool,
    }

    #[async_trait]
    impl HistoryLoader for FailingLoader {
        async fn load_history(
            &self,
            _venue: &VenueId,
            _symbol: &Symbol,
            _since: DateTime<Utc>,
        ) -> PersistenceResult<Vec<FundingObservation>> {
            self.called.store(true, Ordering::SeqCst);
            Err(PersistenceError::Decode("unreachable".into()))
        }
    }

    use crate::error::PersistenceError;

    #[tokio::test]
    async fn test_preload_tolerates_failure_and_returns_empty() {
        let loader = FailingLoader {
            called: AtomicBool::new(false),
        };
        let result = preload(
            &loader,
            &VenueId::new("x"),
            &Symbol::new("BTCUSDT"),
            Utc::now(),
        )
        .await;
        assert!(result.is_empty());
        assert!(loader.called.load(Ordering::SeqCst));
    }

    struct StaticLoader;

    #[async_trait]
    impl HistoryLoader for StaticLoader {
        async fn load_history(
            &self,
            venue: &VenueId,
            symbol: &Symbol,
            _since: DateTime<Utc>,
        ) -> PersistenceResult<Vec<FundingObservation>> {
            Ok(vec![FundingObservation::new(
                venue.clone(),
                symbol.clone(),
                Rate::new(dec!(0.001)),
                Utc::now(),
                Utc::now(),
            )])
        }
    }

    #[tokio::test]
    async fn test_preload_returns_loaded_history() {
        let loader = StaticLoader;
        let result = preload(
            &loader,
            &VenueId::new("x"),
            &Symbol::new("BTCUSDT"),
            Utc::now(),
        )
        .await;
        assert_eq!(result.len(), 1);
    }
}
