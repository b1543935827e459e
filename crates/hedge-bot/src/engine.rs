//! Top-level orchestration: wires every component behind the operator
//! surface (`start_hedging`, `stop_hedging`, `emergency_shutdown`,
//! `status`) and drives the cancellation-aware task set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock as PLRwLock;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use hedge_core::{Clock, Pnl, SystemClock};
use hedge_detector::{Detector, ExtremeEventTracker};
use hedge_engine::HedgeManager;
use hedge_eventbus::{DashboardState, StatusSnapshot};
use hedge_market::{Aggregator, MarketStore};
use hedge_position::HedgeTracker;
use hedge_rebalancer::Rebalancer;
use hedge_risk::RiskEngine;
use hedge_telemetry::DailyStatsReporter;
use hedge_venue::VenueAdapter;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Assembles and drives every component. Library-level entry point; a
/// binary (or a test) supplies the venue adapters and owns the `Engine`.
pub struct Engine {
    config: AppConfig,
    adapters: Vec<Arc<dyn VenueAdapter>>,
    events: broadcast::Sender<hedge_core::Event>,
    market: Arc<MarketStore>,
    detector: Arc<Detector>,
    extreme: Arc<ExtremeEventTracker>,
    hedges: Arc<HedgeManager>,
    risk: Arc<RiskEngine>,
    rebalancer: Arc<Rebalancer>,
    daily_stats: Arc<DailyStatsReporter>,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Engine {
    /// Builds every component from `config` over `adapters`. Does not start
    /// any background task — call `run()` for that.
    #[must_use]
    pub fn new(config: AppConfig, adapters: Vec<Arc<dyn VenueAdapter>>) -> Self {
        let (events, _) = broadcast::channel(1024);
        let market = Arc::new(MarketStore::new(config.history_cap));
        let detector = Arc::new(Detector::new(config.detector.clone(), events.clone()));
        let extreme = Arc::new(ExtremeEventTracker::new(config.detector.clone(), events.clone()));
        let tracker = Arc::new(HedgeTracker::new());
        let risk = Arc::new(RiskEngine::new(
            adapters.clone(),
            config.risk.clone(),
            events.clone(),
        ));
        let hedges = Arc::new(HedgeManager::new(
            adapters.clone(),
            tracker,
            config.engine.clone(),
            events.clone(),
            risk.emergency_flag(),
        ));
        let rebalancer = Arc::new(Rebalancer::new(
            adapters.clone(),
            config.resolved_rebalancer_config(),
            events.clone(),
        ));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let pnl = Arc::new(PLRwLock::new(Pnl::new()));
        let daily_stats = Arc::new(DailyStatsReporter::new(pnl, clock, events.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            adapters,
            events,
            market,
            detector,
            extreme,
            hedges,
            risk,
            rebalancer,
            daily_stats,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Enables automatic hedge opening. Idempotent.
    pub fn start_hedging(&self) {
        info!("hedging enabled");
        self.running.store(true, Ordering::SeqCst);
    }

    /// Disables automatic hedge opening; existing hedges are left alone
    ///. Idempotent.
    pub fn stop_hedging(&self) {
        info!("hedging disabled");
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_hedging(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Immediately flattens every venue position and gates all future
    /// opens, regardless of `start_hedging`/`stop_hedging` state.
    pub async fn emergency_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.risk.emergency_shutdown().await;
    }

    /// A point-in-time snapshot for the operator status surface, shared
    /// with the `/status` HTTP endpoint.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        self.dashboard_state().snapshot()
    }

    #[must_use]
    pub fn dashboard_state(&self) -> DashboardState {
        DashboardState::new(
            self.market.clone(),
            self.hedges.tracker(),
            self.risk.clone(),
            self.events.clone(),
        )
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Sender<hedge_core::Event> {
        self.events.clone()
    }

    /// Preloads bounded funding-rate history for every configured (venue,
    /// symbol) pair before the first live poll.
    /// A no-op unless `persistence.enabled` and `persistence.history_url`
    /// are set; failures are swallowed per-pair by `hedge_persistence::preload`.
    async fn preload_history(&self) {
        if !self.config.persistence.enabled {
            return;
        }
        let Some(url) = self.config.persistence.history_url.clone() else {
            return;
        };
        if self.config.persistence.symbols.is_empty() {
            return;
        }
        let loader = hedge_persistence::RestHistoryLoader::new(url);
        let since = chrono::Utc::now() - chrono::Duration::days(7);
        for adapter in &self.adapters {
            let venue = adapter.venue_id();
            for raw_symbol in &self.config.persistence.symbols {
                let symbol = hedge_core::Symbol::new(raw_symbol);
                let history =
                    hedge_persistence::preload(&loader, &venue, &symbol, since).await;
                for obs in history {
                    self.market.ingest_funding(obs);
                }
            }
        }
    }

    /// One arbitrage re-scan, opening a hedge per detected opportunity when
    /// hedging is enabled.
    async fn scan_and_open(&self) {
        let opportunities = self.detector.scan_arbitrage(&self.market);
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        for event in opportunities {
            if let hedge_core::Event::Arbitrage {
                symbol,
                long_venue,
                short_venue,
                ..
            } = event
            {
                self.hedges
                    .handle_opportunity(symbol, long_venue, short_venue)
                    .await;
            }
        }
    }

    /// Runs until `shutdown_tx` is tripped (e.g. from a SIGINT handler in
    /// `main`), then waits up to `shutdown_grace_secs` for in-flight work
    /// before returning. Already-open hedges are untouched by cancellation
    /// — only `emergency_shutdown()` closes them.
    pub async fn run(self: Arc<Self>) -> AppResult<()> {
        self.config.validate()?;
        self.preload_history().await;

        let obs_detector = self.detector.clone();
        let ticker_extreme = self.extreme.clone();
        let aggregator = Arc::new(
            Aggregator::new(
                self.market.clone(),
                self.adapters.clone(),
                self.config.aggregator.to_aggregator_config(),
                self.events.clone(),
            )
            .with_funding_observer(Arc::new(move |obs| {
                obs_detector.on_observation(obs);
            }))
            .with_ticker_observer(Arc::new(move |_venue, symbol, price, volume| {
                ticker_extreme.ingest(symbol, price, volume);
            })),
        );
        let aggregator_handle = aggregator.clone().spawn();
        let stream_handles = aggregator.spawn_stream_consumers();
        let risk_handle = self.risk.clone().spawn();
        let rebalancer_handle = self.rebalancer.clone().spawn();
        let hedges_handle = self.hedges.clone().spawn_monitor();

        let scan_engine = self.clone();
        let mut scan_shutdown = self.shutdown_rx.clone();
        let scan_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scan_engine.config.aggregator.to_aggregator_config().poll_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => scan_engine.scan_and_open().await,
                    _ = scan_shutdown.changed() => break,
                }
            }
        });

        let stats_engine = self.clone();
        let mut stats_shutdown = self.shutdown_rx.clone();
        let stats_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = ticker.tick() => stats_engine.daily_stats.tick(),
                    _ = stats_shutdown.changed() => break,
                }
            }
        });

        self.shutdown_rx.clone().changed().await.ok();

        let grace = std::time::Duration::from_secs(self.config.shutdown_grace_secs);
        let shutdown = async {
            let _ = tokio::join!(scan_handle, stats_handle);
        };
        if tokio::time::timeout(grace, shutdown).await.is_err() {
            warn!("shutdown grace period elapsed, aborting remaining tasks");
        }

        aggregator_handle.abort();
        risk_handle.abort();
        rebalancer_handle.abort();
        hedges_handle.abort();
        for handle in stream_handles {
            handle.abort();
        }

        Ok(())
    }

    /// Requests shutdown; `run()`'s cancellation-aware loops observe this
    /// on their next tick and begin the grace-deadline drain.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedge_venue::MockAdapter;

    fn engine_with(venues: &[&str]) -> Arc<Engine> {
        let adapters: Vec<Arc<dyn VenueAdapter>> = venues
            .iter()
            .map(|v| Arc::new(MockAdapter::new(*v)) as Arc<dyn VenueAdapter>)
            .collect();
        Arc::new(Engine::new(AppConfig::default(), adapters))
    }

    #[tokio::test]
    async fn test_start_stop_hedging_toggles_flag() {
        let engine = engine_with(&["binance", "bybit"]);
        assert!(!engine.is_hedging());
        engine.start_hedging();
        assert!(engine.is_hedging());
        engine.stop_hedging();
        assert!(!engine.is_hedging());
    }

    #[tokio::test]
    async fn test_status_reflects_empty_initial_state() {
        let engine = engine_with(&["binance", "bybit"]);
        let status = engine.status();
        assert!(status.active_hedges.is_empty());
        assert!(!status.emergency_stopped);
    }

    #[tokio::test]
    async fn test_emergency_shutdown_stops_hedging_and_sets_flag() {
        let engine = engine_with(&["binance", "bybit"]);
        engine.start_hedging();
        engine.emergency_shutdown().await;
        assert!(!engine.is_hedging());
        assert!(engine.status().emergency_stopped);
    }
}
