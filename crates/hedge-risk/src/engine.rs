//! Portfolio exposure tracking, de-risk, and emergency shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use hedge_core::{Event, ExposureSnapshot, OrderSide, RiskParams, Symbol, UsdAmount, VenueId};
use hedge_telemetry::Metrics;
use hedge_venue::VenueAdapter;

use crate::config::RiskConfig;

/// A single venue's reported position, flattened for portfolio-wide math.
#[derive(Debug, Clone)]
pub struct FlatPosition {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub size: rust_decimal::Decimal,
    pub mark_price: rust_decimal::Decimal,
    pub unrealized_pnl: UsdAmount,
}

/// Periodic portfolio exposure engine: computes net exposure, runs de-risk
/// when the ceiling is breached, and coordinates emergency shutdown.
pub struct RiskEngine {
    adapters: Vec<Arc<dyn VenueAdapter>>,
    config: RiskConfig,
    events: broadcast::Sender<Event>,
    exposure: RwLock<ExposureSnapshot>,
    params: RwLock<RiskParams>,
    emergency_stop: Arc<AtomicBool>,
}

impl RiskEngine {
    #[must_use]
    pub fn new(
        adapters: Vec<Arc<dyn VenueAdapter>>,
        config: RiskConfig,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            adapters,
            config,
            events,
            exposure: RwLock::new(ExposureSnapshot::compute(
                UsdAmount::ZERO,
                UsdAmount::ZERO,
                Utc::now(),
            )),
            params: RwLock::new(RiskParams::default()),
            emergency_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle other components (notably the Hedge Lifecycle Manager) use
    /// to check the "no opens after emergency_stop" gate.
    #[must_use]
    pub fn emergency_flag(&self) -> Arc<AtomicBool> {
        self.emergency_stop.clone()
    }

    #[must_use]
    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stop.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn latest_exposure(&self) -> ExposureSnapshot {
        *self.exposure.read()
    }

    /// Collects positions and balances from every venue concurrently,
    /// recomputes net exposure, updates the volatility EWMA, and triggers
    /// de-risk when `|ratio| > max_exposure`.
    pub async fn tick(&self) {
        let positions = self.collect_positions().await;
        let total_value = self.collect_total_value().await;

        let net_value: Decimal = positions
            .iter()
            .map(|p| p.side.sign() * p.size * p.mark_price)
            .sum();
        let snapshot =
            ExposureSnapshot::compute(UsdAmount::new(net_value), total_value, Utc::now());

        let previous_ratio = self.exposure.read().ratio;
        *self.exposure.write() = snapshot;
        Metrics.set_exposure_ratio(snapshot.ratio.to_string().parse::<f64>().unwrap_or(0.0));

        let instant_vol = (snapshot.ratio - previous_ratio)
            .to_string()
            .parse::<f64>()
            .unwrap_or(0.0)
            .abs();
        self.params.write().update_volatility(instant_vol);

        if snapshot.ratio.abs() > self.config.max_exposure {
            warn!(ratio = %snapshot.ratio, max = %self.config.max_exposure, "exposure ceiling breached");
            let _ = self.events.send(Event::RiskExceeded {
                exposure: snapshot.ratio,
                ts: Utc::now(),
            });
            self.de_risk(snapshot, positions).await;
        }
    }

    async fn collect_positions(&self) -> Vec<FlatPosition> {
        let calls = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            async move {
                match adapter.get_positions().await {
                    Ok(positions) => positions
                        .into_iter()
                        .map(|(symbol, info)| FlatPosition {
                            venue: adapter.venue_id(),
                            symbol,
                            side: info.side,
                            size: info.size.inner(),
                            mark_price: info.mark_price,
                            unrealized_pnl: info.unrealized_pnl,
                        })
                        .collect::<Vec<_>>(),
                    Err(err) => {
                        warn!(venue = %adapter.venue_id(), %err, "position fetch failed");
                        Vec::new()
                    }
                }
            }
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    async fn collect_total_value(&self) -> UsdAmount {
        let calls = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            async move { adapter.get_total_balance().await.unwrap_or(Decimal::ZERO) }
        });
        // The source's bug left this unawaited; awaiting the total here and
        // skipping de-risk entirely when it is zero fixes that.
        let total: Decimal = join_all(calls).await.into_iter().sum();
        UsdAmount::new(total)
    }

    /// Sequential, worst-PnL-first position reduction until the exposure
    /// ratio falls to `derisk_target_fraction * max_exposure` or candidates
    /// are exhausted.
    async fn de_risk(&self, snapshot: ExposureSnapshot, positions: Vec<FlatPosition>) {
        if snapshot.total_portfolio_value.is_zero() {
            return;
        }
        let target_ratio = self.config.max_exposure * self.config.derisk_target_fraction;
        let excess = snapshot.ratio.abs() - target_ratio;
        if excess <= Decimal::ZERO {
            return;
        }
        let mut remaining_usd = excess * snapshot.total_portfolio_value.inner();

        let reducing_side = if snapshot.ratio.is_sign_positive() {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };

        let mut candidates: Vec<FlatPosition> = positions
            .into_iter()
            .filter(|p| p.side == reducing_side)
            .collect();
        candidates.sort_by(|a, b| a.unrealized_pnl.inner().cmp(&b.unrealized_pnl.inner()));

        for position in candidates {
            if remaining_usd <= Decimal::ZERO {
                break;
            }
            if position.mark_price.is_zero() {
                continue;
            }
            let close_qty = position.size.min(remaining_usd / position.mark_price);
            if close_qty <= Decimal::ZERO {
                continue;
            }
            let Some(adapter) = self
                .adapters
                .iter()
                .find(|a| a.venue_id() == position.venue)
            else {
                continue;
            };
            match adapter
                .close_position(
                    &position.symbol,
                    Some(reducing_side.opposite()),
                    Some(close_qty),
                )
                .await
            {
                Ok(_) => {
                    info!(venue = %position.venue, symbol = %position.symbol, %close_qty, "de-risk close submitted");
                }
                Err(err) => {
                    warn!(venue = %position.venue, symbol = %position.symbol, %err, "de-risk close failed");
                }
            }
            remaining_usd -= close_qty * position.mark_price;
        }
    }

    /// Disables opens, sets `emergency_stop`, and closes every open
    /// position across every venue concurrently with best-effort error
    /// swallowing.
    pub async fn emergency_shutdown(&self) {
        self.emergency_stop.store(true, Ordering::SeqCst);

        let calls = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            async move {
                match adapter.get_positions().await {
                    Ok(positions) => {
                        for symbol in positions.into_keys() {
                            if let Err(err) =
                                adapter.close_position(&symbol, None, None).await
                            {
                                warn!(venue = %adapter.venue_id(), %symbol, %err, "emergency close failed");
                            }
                        }
                    }
                    Err(err) => {
                        warn!(venue = %adapter.venue_id(), %err, "emergency position fetch failed");
                    }
                }
            }
        });
        join_all(calls).await;

        warn!("emergency shutdown complete");
        let _ = self.events.send(Event::EmergencyShutdown { ts: Utc::now() });
    }

    /// Spawns the periodic risk tick on the current Tokio runtime.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.tick_interval());
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use hedge_core::{FundingObservation, OrderRef, PositionInfo, Qty, Rate};
    use hedge_venue::{AdapterError, AdapterResult, StreamHandle};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct FakeAdapter {
        venue: VenueId,
        total_balance: Decimal,
        positions: Mutex<HashMap<Symbol, PositionInfo>>,
        closed: Mutex<Vec<(Symbol, Decimal)>>,
    }

    #[async_trait]
    impl VenueAdapter for FakeAdapter {
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
            _since: DateTime<Utc>,
        ) -> AdapterResult<Rate> {
            unimplemented!()
        }
        async fn get_mark_price(&self, _symbol: &Symbol) -> AdapterResult<Decimal> {
            unimplemented!()
        }
        async fn get_positions(&self) -> AdapterResult<HashMap<Symbol, PositionInfo>> {
            Ok(self.positions.lock().clone())
        }
        async fn get_total_balance(&self) -> AdapterResult<Decimal> {
            Ok(self.total_balance)
        }
        async fn get_available_balance(&self) -> AdapterResult<Decimal> {
            Ok(self.total_balance)
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
            symbol: &Symbol,
            _side: Option<OrderSide>,
            qty: Option<Decimal>,
        ) -> AdapterResult<OrderRef> {
            let qty = qty.unwrap_or(Decimal::ZERO);
            self.closed.lock().push((symbol.clone(), qty));
            self.positions.lock().remove(symbol);
            Ok(OrderRef {
                order_id: "1".into(),
                symbol: symbol.clone(),
                side: OrderSide::Sell,
                executed_qty: Qty::new(qty),
                avg_price: dec!(100),
            })
        }
        async fn transfer_to(
            &self,
            _other: &dyn VenueAdapter,
            _amount: Decimal,
            _asset: &str,
        ) -> AdapterResult<()> {
            Err(AdapterError::Unsupported("no transfer in test".into()))
        }
        async fn subscribe_stream(&self) -> AdapterResult<StreamHandle> {
            unimplemented!()
        }
    }

    fn position(side: OrderSide, size: Decimal, mark: Decimal, pnl: Decimal) -> PositionInfo {
        PositionInfo {
            side,
            size: Qty::new(size),
            entry_price: mark,
            mark_price: mark,
            unrealized_pnl: UsdAmount::new(pnl),
        }
    }

    #[tokio::test]
    async fn test_tick_computes_ratio_and_skips_zero_total() {
        let adapter = Arc::new(FakeAdapter {
            venue: VenueId::new("x"),
            total_balance: Decimal::ZERO,
            positions: Mutex::new(HashMap::new()),
            closed: Mutex::new(Vec::new()),
        });
        let (tx, _rx) = broadcast::channel(16);
        let engine = RiskEngine::new(vec![adapter], RiskConfig::default(), tx);
        engine.tick().await;
        assert_eq!(engine.latest_exposure().ratio, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_s6_derisk_closes_worst_pnl_first() {
        let mut positions = HashMap::new();
        positions.insert(Symbol::new("A"), position(OrderSide::Buy, dec!(1), dec!(100), dec!(-50)));
        positions.insert(Symbol::new("B"), position(OrderSide::Buy, dec!(1), dec!(100), dec!(30)));
        positions.insert(Symbol::new("C"), position(OrderSide::Buy, dec!(1), dec!(100), dec!(-10)));

        let adapter = Arc::new(FakeAdapter {
            venue: VenueId::new("x"),
            total_balance: dec!(1000),
            positions: Mutex::new(positions),
            closed: Mutex::new(Vec::new()),
        });
        let (tx, _rx) = broadcast::channel(16);
        let mut config = RiskConfig::default();
        config.max_exposure = dec!(0.1);
        let engine = RiskEngine::new(vec![adapter.clone()], config, tx);

        engine.tick().await;

        let closed = adapter.closed.lock().clone();
        assert_eq!(closed[0].0, Symbol::new("A"));
        assert_eq!(closed[1].0, Symbol::new("C"));
    }

    #[tokio::test]
    async fn test_emergency_shutdown_sets_flag_and_closes_positions() {
        let mut positions = HashMap::new();
        positions.insert(Symbol::new("A"), position(OrderSide::Buy, dec!(1), dec!(100), dec!(0)));
        let adapter = Arc::new(FakeAdapter {
            venue: VenueId::new("x"),
            total_balance: dec!(1000),
            positions: Mutex::new(positions),
            closed: Mutex::new(Vec::new()),
        });
        let (tx, mut rx) = broadcast::channel(16);
        let engine = RiskEngine::new(vec![adapter.clone()], RiskConfig::default(), tx);

        engine.emergency_shutdown().await;
        assert!(engine.is_emergency_stopped());
        assert!(adapter.positions.lock().is_empty());
        assert!(matches!(rx.try_recv().unwrap(), Event::EmergencyShutdown { .. }));
    }
}
