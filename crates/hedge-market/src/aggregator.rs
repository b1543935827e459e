//! Periodic polling of every registered venue adapter into the `MarketStore`.
//!
//! Each tick, every adapter's `fetch_funding_rates` runs concurrently under
//! its own timeout, and a failing adapter never blocks or drops the others
//! ("all settled" fan-out semantics).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use hedge_core::{Event, FundingObservation, MarketQuote, StreamEvent, Symbol, VenueId};
use hedge_telemetry::Metrics;
use hedge_venue::VenueAdapter;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::store::MarketStore;

/// Invoked for every `FundingObservation`, from both the periodic poll and
/// the stream path, so a caller (the Alert & Opportunity Detector) sees the
/// same per-observation feed regardless of which input produced it (spec
/// §4.C "On any observation (stream or snapshot)").
pub type FundingObserver = Arc<dyn Fn(&FundingObservation) + Send + Sync>;

/// Invoked for every ticker sample delivered over a stream, feeding the
/// extreme-event tracker without `hedge-market` depending on it.
pub type TickerObserver = Arc<dyn Fn(&VenueId, &Symbol, rust_decimal::Decimal, rust_decimal::Decimal) + Send + Sync>;

/// Tuning for one poller instance.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    pub poll_interval: Duration,
    pub per_call_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let poll_interval = Duration::from_secs(30);
        Self {
            poll_interval,
            per_call_timeout: poll_interval / 2,
        }
    }
}

/// Drives periodic funding-rate polling across every registered adapter,
/// writing results into a shared `MarketStore`.
pub struct Aggregator {
    store: Arc<MarketStore>,
    adapters: Vec<Arc<dyn VenueAdapter>>,
    config: AggregatorConfig,
    events: broadcast::Sender<Event>,
    funding_observer: Option<FundingObserver>,
    ticker_observer: Option<TickerObserver>,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        store: Arc<MarketStore>,
        adapters: Vec<Arc<dyn VenueAdapter>>,
        config: AggregatorConfig,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            store,
            adapters,
            config,
            events,
            funding_observer: None,
            ticker_observer: None,
        }
    }

    /// Registers a callback invoked for every funding observation ingested
    /// from either the periodic poll or a stream.
    #[must_use]
    pub fn with_funding_observer(mut self, observer: FundingObserver) -> Self {
        self.funding_observer = Some(observer);
        self
    }

    /// Registers a callback invoked for every ticker sample delivered over
    /// a stream, feeding extreme-event detection.
    #[must_use]
    pub fn with_ticker_observer(mut self, observer: TickerObserver) -> Self {
        self.ticker_observer = Some(observer);
        self
    }

    /// Runs a single poll cycle: every adapter is queried concurrently, and
    /// each observation is written through to the store. Returns the number
    /// of adapters that failed this cycle.
    pub async fn poll_once(&self) -> usize {
        let calls = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            let timeout = self.config.per_call_timeout;
            async move {
                let venue = adapter.venue_id();
                let result = tokio::time::timeout(timeout, adapter.fetch_funding_rates()).await;
                (venue, result)
            }
        });

        let results = join_all(calls).await;
        let mut failures = 0usize;

        for (venue, result) in results {
            match result {
                Ok(Ok(observations)) => {
                    for obs in observations {
                        self.store.ingest_funding(obs.clone());
                        if let Some(observer) = &self.funding_observer {
                            observer(&obs);
                        }
                    }
                }
                Ok(Err(err)) => {
                    failures += 1;
                    self.emit_fetch_failed(&venue, err.to_string());
                }
                Err(_) => {
                    failures += 1;
                    self.emit_fetch_failed(&venue, "timed out".to_string());
                }
            }
        }

        failures
    }

    fn emit_fetch_failed(&self, venue: &VenueId, error: String) {
        warn!(%venue, %error, "funding rate fetch failed");
        Metrics.record_fetch_failure(&venue.to_string());
        let _ = self.events.send(Event::FetchFailed {
            venue: venue.clone(),
            error,
            ts: Utc::now(),
        });
    }

    /// Spawns the poll loop on the current Tokio runtime. Runs until the
    /// task is aborted by its `JoinHandle`.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.poll_interval);
            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        })
    }

    /// Subscribes to every adapter's push stream and spawns one consumer
    /// task per venue, write-through-ing `Funding`/`Ticker` events into the
    /// store exactly like the periodic poll — a second, independent input
    /// path alongside the polling loop above. The adapter itself owns
    /// reconnect/backoff; a subscribe failure here is logged and that venue
    /// simply contributes no stream data.
    pub fn spawn_stream_consumers(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        self.adapters
            .iter()
            .map(|adapter| {
                let aggregator = self.clone();
                let adapter = adapter.clone();
                tokio::spawn(async move {
                    aggregator.consume_stream(adapter).await;
                })
            })
            .collect()
    }

    async fn consume_stream(&self, adapter: Arc<dyn VenueAdapter>) {
        let venue = adapter.venue_id();
        let mut handle = match adapter.subscribe_stream().await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(%venue, %err, "stream subscription failed, venue will rely on polling only");
                return;
            }
        };
        info!(%venue, "stream subscription established");

        // Sequential per stream: a single consumer task per
        // adapter preserves the order the adapter produced events in.
        while let Some(event) = handle.recv().await {
            match event {
                StreamEvent::Funding {
                    symbol,
                    rate,
                    next_funding_time,
                    observed_at,
                } => {
                    let obs =
                        FundingObservation::new(venue.clone(), symbol, rate, next_funding_time, observed_at);
                    self.store.ingest_funding(obs.clone());
                    if let Some(observer) = &self.funding_observer {
                        observer(&obs);
                    }
                }
                StreamEvent::Ticker {
                    symbol,
                    mark_price,
                    volume,
                    observed_at,
                } => {
                    self.store
                        .ingest_quote(&venue, &symbol, MarketQuote::new(mark_price, observed_at));
                    if let Some(observer) = &self.ticker_observer {
                        observer(&venue, &symbol, mark_price, volume);
                    }
                }
                StreamEvent::Position { symbol, info, .. } => {
                    debug!(%venue, %symbol, side = ?info.side, "stream position update (informational)");
                }
            }
        }
        warn!(%venue, "stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hedge_core::{FundingObservation, OrderRef, OrderSide, PositionInfo, Rate, Symbol};
    use hedge_venue::{AdapterError, AdapterResult, StreamHandle};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct FlakyAdapter {
        venue: VenueId,
        fail: bool,
    }

    #[async_trait]
    impl VenueAdapter for FlakyAdapter {
        fn venue_id(&self) -> VenueId {
            self.venue.clone()
        }

        async fn fetch_funding_rates(&self) -> AdapterResult<Vec<FundingObservation>> {
            if self.fail {
                return Err(AdapterError::Network("boom".into()));
            }
            let now = Utc::now();
            Ok(vec![FundingObservation::new(
                self.venue.clone(),
                Symbol::new("BTCUSDT"),
                Rate::new(dec!(0.0005)),
                now + chrono::Duration::hours(8),
                now,
            )])
        }

        async fn get_funding_rate(&self, _symbol: &Symbol) -> AdapterResult<Rate> {
            unimplemented!()
        }

        async fn get_avg_funding_rate(
            &self,
            _symbol: &Symbol,
            _since: chrono::DateTime<Utc>,
        ) -> AdapterResult<Rate> {
            unimplemented!()
        }

        async fn get_mark_price(&self, _symbol: &Symbol) -> AdapterResult<Decimal> {
            unimplemented!()
        }

        async fn get_positions(&self) -> AdapterResult<HashMap<Symbol, PositionInfo>> {
            unimplemented!()
        }

        async fn get_total_balance(&self) -> AdapterResult<Decimal> {
            unimplemented!()
        }

        async fn get_available_balance(&self) -> AdapterResult<Decimal> {
            unimplemented!()
        }

        async fn create_market_order(
            &self,
            _symbol: &Symbol,
            _side: OrderSide,
            _qty: Decimal,
        ) -> AdapterResult<OrderRef> {
            unimplemented!()
        }

        async fn close_position(
            &self,
            _symbol: &Symbol,
            _side: Option<OrderSide>,
            _qty: Option<Decimal>,
        ) -> AdapterResult<OrderRef> {
            unimplemented!()
        }

        async fn transfer_to(
            &self,
            _other: &dyn VenueAdapter,
            _amount: Decimal,
            _asset: &str,
        ) -> AdapterResult<()> {
            unimplemented!()
        }

        async fn subscribe_stream(&self) -> AdapterResult<StreamHandle> {
            unimplemented!()
        }
    }

    struct StreamingAdapter {
        venue: VenueId,
    }

    #[async_trait]
    impl VenueAdapter for StreamingAdapter {
        fn venue_id(&self) -> VenueId {
            self.venue.clone()
        }
        async fn fetch_funding_rates(&self) -> AdapterResult<Vec<FundingObservation>> {
            Ok(vec![])
        }
        async fn get_funding_rate(&self, _symbol: &Symbol) -> AdapterResult<Rate> {
            unimplemented!()
        }
        async fn get_avg_funding_rate(
            &self,
            _symbol: &Symbol,
            _since: chrono::DateTime<Utc>,
        ) -> AdapterResult<Rate> {
            unimplemented!()
        }
        async fn get_mark_price(&self, _symbol: &Symbol) -> AdapterResult<Decimal> {
            unimplemented!()
        }
        async fn get_positions(&self) -> AdapterResult<HashMap<Symbol, PositionInfo>> {
            unimplemented!()
        }
        async fn get_total_balance(&self) -> AdapterResult<Decimal> {
            unimplemented!()
        }
        async fn get_available_balance(&self) -> AdapterResult<Decimal> {
            unimplemented!()
        }
        async fn create_market_order(
            &self,
            _symbol: &Symbol,
            _side: OrderSide,
            _qty: Decimal,
        ) -> AdapterResult<OrderRef> {
            unimplemented!()
        }
        async fn close_position(
            &self,
            _symbol: &Symbol,
            _side: Option<OrderSide>,
            _qty: Option<Decimal>,
        ) -> AdapterResult<OrderRef> {
            unimplemented!()
        }
        async fn transfer_to(
            &self,
            _other: &dyn VenueAdapter,
            _amount: Decimal,
            _asset: &str,
        ) -> AdapterResult<()> {
            unimplemented!()
        }
        async fn subscribe_stream(&self) -> AdapterResult<StreamHandle> {
            let now = Utc::now();
            let events = vec![
                Ok(StreamEvent::Funding {
                    symbol: Symbol::new("BTCUSDT"),
                    rate: Rate::new(dec!(0.0012)),
                    next_funding_time: now + chrono::Duration::hours(8),
                    observed_at: now,
                }),
                Ok(StreamEvent::Ticker {
                    symbol: Symbol::new("BTCUSDT"),
                    mark_price: dec!(50000),
                    volume: dec!(12),
                    observed_at: now,
                }),
            ];
            Ok(hedge_venue::spawn_reconnecting(
                hedge_venue::ReconnectConfig::default(),
                move || {
                    let events = events.clone();
                    async move { Ok(futures_util::stream::iter(events)) }
                },
            ))
        }
    }

    #[tokio::test]
    async fn test_stream_consumer_writes_through_funding_and_ticker() {
        let store = Arc::new(MarketStore::new(10));
        let adapter: Arc<dyn VenueAdapter> = Arc::new(StreamingAdapter {
            venue: VenueId::new("binance"),
        });
        let (tx, _rx) = broadcast::channel(16);
        let seen_funding = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_funding2 = seen_funding.clone();
        let seen_ticker = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_ticker2 = seen_ticker.clone();

        let aggregator = Arc::new(
            Aggregator::new(store.clone(), vec![adapter], AggregatorConfig::default(), tx)
                .with_funding_observer(Arc::new(move |obs| {
                    seen_funding2.lock().push(obs.rate.inner());
                }))
                .with_ticker_observer(Arc::new(move |_venue, _symbol, price, _volume| {
                    seen_ticker2.lock().push(price);
                })),
        );

        let handles = aggregator.spawn_stream_consumers();
        // The stream yields both events immediately; give the consumer task
        // a chance to run before asserting.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        for handle in handles {
            handle.abort();
        }

        assert_eq!(*seen_funding.lock(), vec![dec!(0.0012)]);
        assert_eq!(*seen_ticker.lock(), vec![dec!(50000)]);
        assert!(store
            .latest_funding(&VenueId::new("binance"), &Symbol::new("BTCUSDT"))
            .is_some());
        assert!(store
            .latest_quote(&VenueId::new("binance"), &Symbol::new("BTCUSDT"))
            .is_some());
    }

    #[tokio::test]
    async fn test_one_failing_adapter_does_not_block_others() {
        let store = Arc::new(MarketStore::new(10));
        let adapters: Vec<Arc<dyn VenueAdapter>> = vec![
            Arc::new(FlakyAdapter {
                venue: VenueId::new("binance"),
                fail: false,
            }),
            Arc::new(FlakyAdapter {
                venue: VenueId::new("bybit"),
                fail: true,
            }),
        ];
        let (tx, mut rx) = broadcast::channel(16);
        let aggregator = Aggregator::new(store.clone(), adapters, AggregatorConfig::default(), tx);

        let failures = aggregator.poll_once().await;
        assert_eq!(failures, 1);

        assert!(store
            .latest_funding(&VenueId::new("binance"), &Symbol::new("BTCUSDT"))
            .is_some());
        assert!(store
            .latest_funding(&VenueId::new("bybit"), &Symbol::new("BTCUSDT"))
            .is_none());

        let event = rx.try_recv().unwrap();
        matches!(event, Event::FetchFailed { .. });
    }
}
