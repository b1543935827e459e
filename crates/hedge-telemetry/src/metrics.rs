//! Prometheus metrics surface for the hedge engine.
//!
//! One process-wide registry, lazily initialized, mirroring the event set
//! published on the event bus so operators can alert on the same signals
//! without subscribing to the bus itself.

use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_int_counter_vec, Gauge, IntCounterVec, Registry,
};

use hedge_core::{AlertLevel, CloseReason, HedgeState};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static FETCH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "hedge_fetch_failures_total",
        "Funding-rate/price fetch failures, by venue.",
        &["venue"]
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

static ALERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "hedge_alerts_total",
        "Funding-rate threshold alerts emitted, by level.",
        &["level"]
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

static ARBITRAGE_OPPORTUNITIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "hedge_arbitrage_opportunities_total",
        "Cross-venue arbitrage opportunities detected, by symbol.",
        &["symbol"]
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

static HEDGE_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "hedge_state_transitions_total",
        "Hedge lifecycle state transitions, by resulting state.",
        &["state"]
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

static HEDGE_CLOSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "hedge_closes_total",
        "Closed hedges, by close reason.",
        &["reason"]
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

static EXPOSURE_RATIO: Lazy<Gauge> = Lazy::new(|| {
    let gauge = register_gauge!(
        "hedge_exposure_ratio",
        "Latest portfolio net exposure ratio (net_value / total_value)."
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(gauge.clone())).ok();
    gauge
});

static REBALANCE_TRANSFERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "hedge_rebalance_transfers_total",
        "Cross-venue rebalance transfers, by source venue.",
        &["from_venue"]
    )
    .expect("metric registration");
    REGISTRY.register(Box::new(counter.clone())).ok();
    counter
});

/// Thin, cheaply-cloneable handle over the process-wide metric registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics;

impl Metrics {
    #[must_use]
    pub fn registry() -> &'static Registry {
        &REGISTRY
    }

    pub fn record_fetch_failure(&self, venue: &str) {
        FETCH_FAILURES_TOTAL.with_label_values(&[venue]).inc();
    }

    pub fn record_alert(&self, level: AlertLevel) {
        ALERTS_TOTAL.with_label_values(&[&level.to_string()]).inc();
    }

    pub fn record_arbitrage_opportunity(&self, symbol: &str) {
        ARBITRAGE_OPPORTUNITIES_TOTAL
            .with_label_values(&[symbol])
            .inc();
    }

    pub fn record_hedge_transition(&self, state: HedgeState) {
        HEDGE_TRANSITIONS_TOTAL
            .with_label_values(&[state_label(state)])
            .inc();
    }

    pub fn record_hedge_close(&self, reason: CloseReason) {
        HEDGE_CLOSES_TOTAL
            .with_label_values(&[close_reason_label(reason)])
            .inc();
    }

    pub fn set_exposure_ratio(&self, ratio: f64) {
        EXPOSURE_RATIO.set(ratio);
    }

    pub fn record_rebalance_transfer(&self, from_venue: &str) {
        REBALANCE_TRANSFERS_TOTAL
            .with_label_values(&[from_venue])
            .inc();
    }
}

fn state_label(state: HedgeState) -> &'static str {
    match state {
        HedgeState::Opening => "opening",
        HedgeState::Active => "active",
        HedgeState::Closing => "closing",
        HedgeState::Closed => "closed",
        HedgeState::Failed => "failed",
        HedgeState::CloseFailed => "close_failed",
    }
}

fn close_reason_label(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::TakeProfit => "take_profit",
        CloseReason::StopLoss => "stop_loss",
        CloseReason::SpreadCollapsed => "spread_collapsed",
        CloseReason::Emergency => "emergency",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fetch_failure_increments_counter() {
        let metrics = Metrics;
        metrics.record_fetch_failure("binance");
        assert_eq!(FETCH_FAILURES_TOTAL.with_label_values(&["binance"]).get(), 1);
    }

    #[test]
    fn test_set_exposure_ratio() {
        let metrics = Metrics;
        metrics.set_exposure_ratio(0.05);
        assert_eq!(EXPOSURE_RATIO.get(), 0.05);
    }

    #[test]
    fn test_record_hedge_close_labels_by_reason() {
        let metrics = Metrics;
        metrics.record_hedge_close(CloseReason::TakeProfit);
        assert_eq!(
            HEDGE_CLOSES_TOTAL.with_label_values(&["take_profit"]).get(),
            1
        );
    }
}
