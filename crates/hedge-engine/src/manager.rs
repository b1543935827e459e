//! The Hedge Lifecycle Manager: idempotent open, monitor,
//! close, and reconciliation of delta-neutral hedge pairs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use hedge_core::{
    CloseReason, Event, Hedge, HedgeKey, HedgeState, OrderSide, Qty, Symbol, UsdAmount, VenueId,
};
use hedge_position::{HedgeTracker, OpenOutcome};
use hedge_telemetry::Metrics;
use hedge_venue::VenueAdapter;

use crate::config::{EngineConfig, LegSizing};

const CLOSE_RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_millis(500);

/// Owns the `HedgeTracker` as its single writer, and drives opens,
/// monitoring, and closes against the venue adapters it was built with.
pub struct HedgeManager {
    venues: HashMap<VenueId, Arc<dyn VenueAdapter>>,
    tracker: Arc<HedgeTracker>,
    config: EngineConfig,
    events: broadcast::Sender<Event>,
    emergency_stop: Arc<AtomicBool>,
}

impl HedgeManager {
    #[must_use]
    pub fn new(
        adapters: Vec<Arc<dyn VenueAdapter>>,
        tracker: Arc<HedgeTracker>,
        config: EngineConfig,
        events: broadcast::Sender<Event>,
        emergency_stop: Arc<AtomicBool>,
    ) -> Self {
        let venues = adapters.into_iter().map(|a| (a.venue_id(), a)).collect();
        Self {
            venues,
            tracker,
            config,
            events,
            emergency_stop,
        }
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<HedgeTracker> {
        self.tracker.clone()
    }

    /// Reacts to a detected arbitrage opportunity by opening a hedge.
    pub async fn handle_opportunity(&self, symbol: Symbol, long_venue: VenueId, short_venue: VenueId) {
        let key = HedgeKey::new(symbol.clone(), long_venue.clone(), short_venue.clone());

        if let Some(existing) = self.tracker.get(&key) {
            if !existing.state.is_terminal() {
                return;
            }
        }
        if !self.config.auto_hedge || self.emergency_stop.load(Ordering::SeqCst) {
            return;
        }
        let (Some(long_adapter), Some(short_adapter)) =
            (self.venues.get(&long_venue), self.venues.get(&short_venue))
        else {
            warn!(%long_venue, %short_venue, "unknown venue in arbitrage opportunity");
            return;
        };

        let (long_avail, short_avail) = tokio::join!(
            long_adapter.get_available_balance(),
            short_adapter.get_available_balance(),
        );
        let (long_avail, short_avail) = match (long_avail, short_avail) {
            (Ok(l), Ok(s)) => (l, s),
            _ => {
                warn!(%key, "balance fetch failed during hedge open, skipping");
                return;
            }
        };

        let size_usd = long_avail.min(short_avail) * self.config.leg_size_fraction;
        if size_usd <= Decimal::ZERO {
            warn!(%key, "insufficient funds, skipping hedge open");
            return;
        }

        let (long_price, short_price) = tokio::join!(
            long_adapter.get_mark_price(&symbol),
            short_adapter.get_mark_price(&symbol),
        );
        let (long_price, short_price) = match (long_price, short_price) {
            (Ok(l), Ok(s)) => (l, s),
            _ => {
                warn!(%key, "mark price fetch failed during hedge open, skipping");
                return;
            }
        };

        let (long_qty, short_qty) = match self.config.leg_sizing {
            LegSizing::EqualNotional => (
                Qty::new(size_usd / long_price).round_down(8),
                Qty::new(size_usd / short_price).round_down(8),
            ),
            LegSizing::EqualQty => {
                let qty = Qty::new(size_usd / long_price).round_down(8);
                (qty, qty)
            }
        };

        let mut hedge = Hedge::opening(key.clone(), long_price, short_price, Utc::now());
        hedge.size = long_qty;
        if self.tracker.try_open(hedge) == OpenOutcome::AlreadyInFlight {
            return;
        }

        let (long_result, short_result) = tokio::join!(
            long_adapter.create_market_order(&symbol, OrderSide::Buy, long_qty.inner()),
            short_adapter.create_market_order(&symbol, OrderSide::Sell, short_qty.inner()),
        );

        match (long_result, short_result) {
            (Ok(long_ref), Ok(short_ref)) => {
                let _ = self.tracker.update(&key, |h| {
                    h.long_order_ref = Some(long_ref);
                    h.short_order_ref = Some(short_ref);
                    h.state = HedgeState::Active;
                });
                info!(%key, %long_qty, "hedge opened");
                Metrics.record_hedge_transition(HedgeState::Active);
                let _ = self.events.send(Event::HedgeOpened {
                    key: key.clone(),
                    size: long_qty,
                    ts: Utc::now(),
                });
            }
            (Ok(long_ref), Err(err)) => {
                warn!(%key, %err, "short leg failed, reconciling long leg");
                self.reconcile_leg(long_adapter.as_ref(), &symbol, OrderSide::Sell, long_ref.executed_qty)
                    .await;
                self.fail_open(&key, true).await;
            }
            (Err(err), Ok(short_ref)) => {
                warn!(%key, %err, "long leg failed, reconciling short leg");
                self.reconcile_leg(short_adapter.as_ref(), &symbol, OrderSide::Buy, short_ref.executed_qty)
                    .await;
                self.fail_open(&key, true).await;
            }
            (Err(long_err), Err(short_err)) => {
                warn!(%key, %long_err, %short_err, "both legs failed to open");
                self.fail_open(&key, false).await;
            }
        }
    }

    async fn reconcile_leg(
        &self,
        adapter: &dyn VenueAdapter,
        symbol: &Symbol,
        closing_side: OrderSide,
        qty: Qty,
    ) {
        for attempt in 1..=self.config.max_close_retries {
            match adapter
                .close_position(symbol, Some(closing_side), Some(qty.inner()))
                .await
            {
                Ok(_) => return,
                Err(err) => {
                    warn!(%symbol, attempt, %err, "reconciliation close failed, retrying");
                    tokio::time::sleep(CLOSE_RETRY_BACKOFF * attempt).await;
                }
            }
        }
        warn!(%symbol, "reconciliation close exhausted retries, leg left open");
    }

    async fn fail_open(&self, key: &HedgeKey, partial_fill: bool) {
        let _ = self.tracker.update(key, |h| h.state = HedgeState::Failed);
        Metrics.record_hedge_transition(HedgeState::Failed);
        let _ = self.events.send(Event::HedgeFailed {
            key: key.clone(),
            partial_fill,
            ts: Utc::now(),
        });
    }

    /// One pass of the periodic monitor loop over every `Active` hedge.
    pub async fn monitor_tick(&self) {
        for hedge in self.tracker.active() {
            self.monitor_one(&hedge).await;
        }
    }

    async fn monitor_one(&self, hedge: &Hedge) {
        let key = &hedge.key;
        let (Some(long_adapter), Some(short_adapter)) = (
            self.venues.get(&key.long_venue),
            self.venues.get(&key.short_venue),
        ) else {
            return;
        };

        let (long_price, short_price) = tokio::join!(
            long_adapter.get_mark_price(&key.symbol),
            short_adapter.get_mark_price(&key.symbol),
        );
        let (long_price, short_price) = match (long_price, short_price) {
            (Ok(l), Ok(s)) => (l, s),
            _ => {
                warn!(%key, "mark price fetch failed during monitor tick");
                return;
            }
        };

        let current_ratio = (short_price - long_price) / long_price;
        let ratio_change = hedge.entry_spread_ratio - current_ratio;

        if ratio_change >= self.config.take_profit * Decimal::new(5, 1) {
            self.close(key, CloseReason::TakeProfit).await;
            return;
        }
        if ratio_change <= -self.config.stop_loss {
            self.close(key, CloseReason::StopLoss).await;
            return;
        }

        let (long_rate, short_rate) = tokio::join!(
            long_adapter.get_funding_rate(&key.symbol),
            short_adapter.get_funding_rate(&key.symbol),
        );
        if let (Ok(long_rate), Ok(short_rate)) = (long_rate, short_rate) {
            let spread = (short_rate.inner() - long_rate.inner()).abs();
            if spread < self.config.warning_threshold {
                self.close(key, CloseReason::SpreadCollapsed).await;
            }
        }
    }

    /// Closes every currently `Active` hedge with reason `Emergency`, used
    /// by the operator's `emergency_shutdown()` surface for a graceful,
    /// leg-paired exit (distinct from the Risk Engine's raw position
    /// flatten, which acts on venue positions directly).
    pub async fn close_all_active(&self) {
        for hedge in self.tracker.active() {
            self.close(&hedge.key, CloseReason::Emergency).await;
        }
    }

    /// Transitions `Active -> Closing`, submits both opposite legs
    /// concurrently, and retries a failing leg up to `max_close_retries`
    /// times before escalating to `CloseFailed`.
    pub async fn close(&self, key: &HedgeKey, reason: CloseReason) {
        let Some(hedge) = self.tracker.get(key) else {
            return;
        };
        if self
            .tracker
            .transition(key, HedgeState::Active, HedgeState::Closing)
            .is_err()
        {
            return;
        }

        let (Some(long_adapter), Some(short_adapter)) = (
            self.venues.get(&key.long_venue),
            self.venues.get(&key.short_venue),
        ) else {
            self.mark_close_failed(key).await;
            return;
        };

        let long_ok = self
            .close_leg_with_retry(long_adapter.as_ref(), &key.symbol, OrderSide::Sell, hedge.size)
            .await;
        let short_ok = self
            .close_leg_with_retry(short_adapter.as_ref(), &key.symbol, OrderSide::Buy, hedge.size)
            .await;

        if !long_ok || !short_ok {
            self.mark_close_failed(key).await;
            return;
        }

        let (long_price, short_price) = tokio::join!(
            long_adapter.get_mark_price(&key.symbol),
            short_adapter.get_mark_price(&key.symbol),
        );
        let realized_pnl = match (long_price, short_price) {
            (Ok(l), Ok(s)) => crate::pnl::mark_to_market(&hedge, l, s),
            _ => UsdAmount::ZERO,
        };

        let _ = self.tracker.update(key, |h| {
            h.state = HedgeState::Closed;
            h.closed_at = Some(Utc::now());
            h.close_reason = Some(reason);
            h.realized_pnl = Some(realized_pnl);
        });
        info!(%key, ?reason, %realized_pnl, "hedge closed");
        Metrics.record_hedge_transition(HedgeState::Closed);
        Metrics.record_hedge_close(reason);
        let _ = self.events.send(Event::HedgeClosed {
            key: key.clone(),
            reason,
            realized_pnl,
            ts: Utc::now(),
        });
    }

    async fn close_leg_with_retry(
        &self,
        adapter: &dyn VenueAdapter,
        symbol: &Symbol,
        side: OrderSide,
        qty: Qty,
    ) -> bool {
        for attempt in 1..=self.config.max_close_retries {
            match adapter
                .close_position(symbol, Some(side), Some(qty.inner()))
                .await
            {
                Ok(_) => return true,
                Err(err) => {
                    warn!(%symbol, attempt, %err, "close leg failed, retrying");
                    tokio::time::sleep(CLOSE_RETRY_BACKOFF * attempt).await;
                }
            }
        }
        false
    }

    async fn mark_close_failed(&self, key: &HedgeKey) {
        let _ = self.tracker.update(key, |h| h.state = HedgeState::CloseFailed);
        Metrics.record_hedge_transition(HedgeState::CloseFailed);
        warn!(%key, "close failed, operator intervention required");
        let _ = self.events.send(Event::HedgeCloseFailed {
            key: key.clone(),
            ts: Utc::now(),
        });
    }

    /// Spawns the periodic monitor loop on the current Tokio runtime.
    pub fn spawn_monitor(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.monitor_interval());
            loop {
                ticker.tick().await;
                self.monitor_tick().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use hedge_core::{FundingObservation, OrderRef, PositionInfo, Rate};
    use hedge_venue::{AdapterError, AdapterResult, StreamHandle};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    struct FakeAdapter {
        venue: VenueId,
        balance: Decimal,
        mark_price: Mutex<Decimal>,
        funding_rate: Mutex<Decimal>,
        fail_orders: bool,
        orders: Mutex<Vec<(OrderSide, Decimal)>>,
        closes: Mutex<Vec<(OrderSide, Decimal)>>,
    }

    impl FakeAdapter {
        fn new(venue: &str, balance: Decimal, mark_price: Decimal) -> Self {
            Self {
                venue: VenueId::new(venue),
                balance,
                mark_price: Mutex::new(mark_price),
                funding_rate: Mutex::new(dec!(0.001)),
                fail_orders: false,
                orders: Mutex::new(Vec::new()),
                closes: Mutex::new(Vec::new()),
            }
        }
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
            Ok(Rate::new(*self.funding_rate.lock()))
        }
        async fn get_avg_funding_rate(
            &self,
            _symbol: &Symbol,
            _since: DateTime<Utc>,
        ) -> AdapterResult<Rate> {
            Ok(Rate::new(*self.funding_rate.lock()))
        }
        async fn get_mark_price(&self, _symbol: &Symbol) -> AdapterResult<Decimal> {
            Ok(*self.mark_price.lock())
        }
        async fn get_positions(&self) -> AdapterResult<std::collections::HashMap<Symbol, PositionInfo>> {
            Ok(std::collections::HashMap::new())
        }
        async fn get_total_balance(&self) -> AdapterResult<Decimal> {
            Ok(self.balance)
        }
        async fn get_available_balance(&self) -> AdapterResult<Decimal> {
            Ok(self.balance)
        }
        async fn create_market_order(
            &self,
            symbol: &Symbol,
            side: OrderSide,
            qty: Decimal,
        ) -> AdapterResult<OrderRef> {
            if self.fail_orders {
                return Err(AdapterError::Exchange {
                    code: "rejected".into(),
                    msg: "rejected".into(),
                });
            }
            self.orders.lock().push((side, qty));
            Ok(OrderRef {
                order_id: "1".into(),
                symbol: symbol.clone(),
                side,
                executed_qty: Qty::new(qty),
                avg_price: *self.mark_price.lock(),
            })
        }
        async fn close_position(
            &self,
            _symbol: &Symbol,
            side: Option<OrderSide>,
            qty: Option<Decimal>,
        ) -> AdapterResult<OrderRef> {
            let side = side.unwrap_or(OrderSide::Sell);
            let qty = qty.unwrap_or(Decimal::ZERO);
            self.closes.lock().push((side, qty));
            Ok(OrderRef {
                order_id: "2".into(),
                symbol: Symbol::new("BTCUSDT"),
                side,
                executed_qty: Qty::new(qty),
                avg_price: *self.mark_price.lock(),
            })
        }
        async fn transfer_to(
            &self,
            _other: &dyn VenueAdapter,
            _amount: Decimal,
            _asset: &str,
        ) -> AdapterResult<()> {
            Err(AdapterError::Unsupported("n/a".into()))
        }
        async fn subscribe_stream(&self) -> AdapterResult<StreamHandle> {
            unimplemented!()
        }
    }

    fn harness(
        x: Arc<FakeAdapter>,
        y: Arc<FakeAdapter>,
    ) -> (Arc<HedgeManager>, broadcast::Receiver<Event>) {
        let (tx, rx) = broadcast::channel(32);
        let mut config = EngineConfig::default();
        config.auto_hedge = true;
        let manager = HedgeManager::new(
            vec![x, y],
            Arc::new(HedgeTracker::new()),
            config,
            tx,
            Arc::new(AtomicBool::new(false)),
        );
        (Arc::new(manager), rx)
    }

    #[tokio::test]
    async fn test_s2_arbitrage_open_sizes_and_opens() {
        let x = Arc::new(FakeAdapter::new("x", dec!(1000), dec!(50000)));
        let y = Arc::new(FakeAdapter::new("y", dec!(1000), dec!(50000)));
        let (manager, mut rx) = harness(x.clone(), y.clone());

        manager
            .handle_opportunity(Symbol::new("BTCUSDT"), VenueId::new("x"), VenueId::new("y"))
            .await;

        let ev = rx.try_recv().unwrap();
        match ev {
            Event::HedgeOpened { size, .. } => assert_eq!(size.inner(), dec!(0.01)),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(x.orders.lock()[0], (OrderSide::Buy, dec!(0.01)));
        assert_eq!(y.orders.lock()[0], (OrderSide::Sell, dec!(0.01)));
    }

    #[tokio::test]
    async fn test_s3_idempotent_second_open_is_a_no_op() {
        let x = Arc::new(FakeAdapter::new("x", dec!(1000), dec!(50000)));
        let y = Arc::new(FakeAdapter::new("y", dec!(1000), dec!(50000)));
        let (manager, mut rx) = harness(x.clone(), y.clone());

        manager
            .handle_opportunity(Symbol::new("BTCUSDT"), VenueId::new("x"), VenueId::new("y"))
            .await;
        rx.try_recv().unwrap();
        manager
            .handle_opportunity(Symbol::new("BTCUSDT"), VenueId::new("x"), VenueId::new("y"))
            .await;

        assert_eq!(x.orders.lock().len(), 1);
        assert_eq!(y.orders.lock().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_s4_partial_fill_reconciles_successful_leg() {
        let x = Arc::new(FakeAdapter::new("x", dec!(1000), dec!(50000)));
        let mut y_adapter = FakeAdapter::new("y", dec!(1000), dec!(50000));
        y_adapter.fail_orders = true;
        let y = Arc::new(y_adapter);
        let (manager, mut rx) = harness(x.clone(), y.clone());

        manager
            .handle_opportunity(Symbol::new("BTCUSDT"), VenueId::new("x"), VenueId::new("y"))
            .await;

        match rx.try_recv().unwrap() {
            Event::HedgeFailed { partial_fill, .. } => assert!(partial_fill),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(x.closes.lock()[0], (OrderSide::Sell, dec!(0.01)));
    }

    #[tokio::test]
    async fn test_s5_take_profit_closes_both_legs() {
        let x = Arc::new(FakeAdapter::new("x", dec!(1000), dec!(50000)));
        let y = Arc::new(FakeAdapter::new("y", dec!(1000), dec!(50000)));
        let (tx, mut rx) = broadcast::channel(32);
        let mut config = EngineConfig::default();
        config.auto_hedge = true;
        // Scenario-specific take_profit (spec S5), distinct from the 0.10 default.
        config.take_profit = dec!(0.01);
        let manager = Arc::new(HedgeManager::new(
            vec![x.clone(), y.clone()],
            Arc::new(HedgeTracker::new()),
            config,
            tx,
            Arc::new(AtomicBool::new(false)),
        ));

        manager
            .handle_opportunity(Symbol::new("BTCUSDT"), VenueId::new("x"), VenueId::new("y"))
            .await;
        rx.try_recv().unwrap();

        *x.mark_price.lock() = dec!(50500);
        *y.mark_price.lock() = dec!(50000);

        manager.monitor_tick().await;

        match rx.try_recv().unwrap() {
            Event::HedgeClosed { reason, .. } => assert_eq!(reason, CloseReason::TakeProfit),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(x.closes.lock()[0].0, OrderSide::Sell);
        assert_eq!(y.closes.lock()[0].0, OrderSide::Buy);
    }
}
