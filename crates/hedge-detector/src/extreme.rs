//! Extreme-event detection: price surge/crash, liquidity drop, volatility
//! spike. An auxiliary classifier pipeline, consumed here as a hedge guard.
//!
//! Floats are used here deliberately — spec.md §4.D/§4.F call out
//! volatility and statistics math as approximate, the one place this
//! engine's "floats never for prices/sizes/rates/PnL" invariant does not
//! apply.

use std::collections::VecDeque;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::broadcast;

use hedge_core::{Event, ExtremeEventKind, Symbol};

use crate::config::DetectorConfig;

struct Window {
    prices: VecDeque<f64>,
    volumes: VecDeque<f64>,
    log_returns: VecDeque<f64>,
    cap: usize,
}

impl Window {
    fn new(cap: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(cap),
            volumes: VecDeque::with_capacity(cap),
            log_returns: VecDeque::with_capacity(cap),
            cap,
        }
    }

    fn push(&mut self, price: f64, volume: f64) {
        if let Some(&last_price) = self.prices.back() {
            if last_price > 0.0 && price > 0.0 {
                let ret = (price / last_price).ln();
                push_capped(&mut self.log_returns, ret, self.cap);
            }
        }
        push_capped(&mut self.prices, price, self.cap);
        push_capped(&mut self.volumes, volume, self.cap);
    }
}

fn push_capped(buf: &mut VecDeque<f64>, value: f64, cap: usize) {
    buf.push_back(value);
    if buf.len() > cap {
        buf.pop_front();
    }
}

fn mean(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stdev(values: &VecDeque<f64>) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Tracks a rolling window of mark prices and volumes per symbol and flags
/// surge/crash/liquidity-drop/volatility-spike conditions on each new quote.
pub struct ExtremeEventTracker {
    config: DetectorConfig,
    windows: DashMap<Symbol, Window>,
    events: broadcast::Sender<Event>,
}

impl ExtremeEventTracker {
    #[must_use]
    pub fn new(config: DetectorConfig, events: broadcast::Sender<Event>) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            events,
        }
    }

    /// Ingests a (price, volume) sample for `symbol`, publishing any
    /// extreme-event flags this sample triggers.
    pub fn ingest(&self, symbol: &Symbol, price: rust_decimal::Decimal, volume: rust_decimal::Decimal) {
        let price = price.to_f64().unwrap_or(0.0);
        let volume = volume.to_f64().unwrap_or(0.0);

        let mut window = self
            .windows
            .entry(symbol.clone())
            .or_insert_with(|| Window::new(self.config.extreme_event_window));

        let prev_mean_volume = mean(&window.volumes);
        let prev_mean_vol = stdev(&window.log_returns);
        let last_return = window.prices.back().copied().map(|last| {
            if last > 0.0 && price > 0.0 {
                (price / last).ln()
            } else {
                0.0
            }
        });

        window.push(price, volume);
        let window_cap = window.cap;
        drop(window);

        let surge_threshold = self.config.surge_threshold.to_f64().unwrap_or(0.05);
        let liquidity_ratio = self.config.liquidity_drop_ratio.to_f64().unwrap_or(0.30);
        let spike_multiple = self
            .config
            .volatility_spike_multiple
            .to_f64()
            .unwrap_or(3.0);

        if let Some(ret) = last_return {
            if ret >= surge_threshold {
                self.emit(symbol, ExtremeEventKind::PriceSurge, ret);
            } else if ret <= -surge_threshold {
                self.emit(symbol, ExtremeEventKind::PriceCrash, ret);
            }
        }

        if prev_mean_volume > 0.0 && volume < liquidity_ratio * prev_mean_volume {
            self.emit(symbol, ExtremeEventKind::LiquidityDrop, volume);
        }

        if window_cap >= 2 {
            if let Some(ret) = last_return {
                if prev_mean_vol > 0.0 && ret.abs() > spike_multiple * prev_mean_vol {
                    self.emit(symbol, ExtremeEventKind::VolatilitySpike, ret.abs());
                }
            }
        }
    }

    fn emit(&self, symbol: &Symbol, kind: ExtremeEventKind, value: f64) {
        let _ = self.events.send(Event::ExtremeEvent {
            kind,
            symbol: symbol.clone(),
            value,
            ts: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tracker() -> (ExtremeEventTracker, broadcast::Receiver<Event>) {
        let (tx, rx) = broadcast::channel(64);
        (ExtremeEventTracker::new(DetectorConfig::default(), tx), rx)
    }

    #[test]
    fn test_price_surge_flagged_above_threshold() {
        let (tracker, mut rx) = tracker();
        let symbol = Symbol::new("BTCUSDT");
        tracker.ingest(&symbol, dec!(50000), dec!(100));
        tracker.ingest(&symbol, dec!(53000), dec!(100));

        let ev = rx.try_recv().unwrap();
        assert!(matches!(
            ev,
            Event::ExtremeEvent {
                kind: ExtremeEventKind::PriceSurge,
                ..
            }
        ));
    }

    #[test]
    fn test_price_crash_flagged_below_negative_threshold() {
        let (tracker, mut rx) = tracker();
        let symbol = Symbol::new("BTCUSDT");
        tracker.ingest(&symbol, dec!(50000), dec!(100));
        tracker.ingest(&symbol, dec!(47000), dec!(100));

        let ev = rx.try_recv().unwrap();
        assert!(matches!(
            ev,
            Event::ExtremeEvent {
                kind: ExtremeEventKind::PriceCrash,
                ..
            }
        ));
    }

    #[test]
    fn test_liquidity_drop_flagged_below_30_percent_of_mean() {
        let (tracker, mut rx) = tracker();
        let symbol = Symbol::new("BTCUSDT");
        for _ in 0..5 {
            tracker.ingest(&symbol, dec!(50000), dec!(100));
        }
        let _ = rx.try_recv(); // drain whatever accumulated, if anything
        while rx.try_recv().is_ok() {}

        tracker.ingest(&symbol, dec!(50010), dec!(10));
        let mut saw_liquidity_drop = false;
        while let Ok(ev) = rx.try_recv() {
            if matches!(
                ev,
                Event::ExtremeEvent {
                    kind: ExtremeEventKind::LiquidityDrop,
                    ..
                }
            ) {
                saw_liquidity_drop = true;
            }
        }
        assert!(saw_liquidity_drop);
    }
}
