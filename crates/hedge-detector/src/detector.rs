//! Per-observation alerting and the cross-venue arbitrage scan.

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use hedge_core::{Event, FundingObservation, Rate, Symbol, VenueId};
use hedge_market::MarketStore;
use hedge_telemetry::Metrics;

use crate::config::DetectorConfig;
use crate::counter::AlertCounter;

/// Outcome of `Detector::on_observation`: whether this tick's severity
/// should trigger an arbitrage re-scan (a hedge re-evaluation pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationOutcome {
    pub triggers_rescan: bool,
}

/// Evaluates funding-rate thresholds per observation and runs the
/// intersection-based arbitrage scan across the `MarketStore`.
pub struct Detector {
    config: DetectorConfig,
    counter: AlertCounter,
    events: broadcast::Sender<Event>,
}

impl Detector {
    #[must_use]
    pub fn new(config: DetectorConfig, events: broadcast::Sender<Event>) -> Self {
        Self {
            config,
            counter: AlertCounter::new(),
            events,
        }
    }

    #[must_use]
    pub fn alert_count(&self, venue: &VenueId, symbol: &Symbol) -> u64 {
        self.counter.get(venue, symbol)
    }

    /// Applies the warning/critical thresholds to a single observation,
    /// updates the alert counter, and emits an `Alert` event when the
    /// magnitude is above warning.
    pub fn on_observation(&self, obs: &FundingObservation) -> ObservationOutcome {
        let magnitude = obs.rate.abs();

        if magnitude > self.config.critical_rate() {
            self.counter.increment(&obs.venue, &obs.symbol);
            self.emit_alert(obs, hedge_core::AlertLevel::Critical);
            return ObservationOutcome {
                triggers_rescan: true,
            };
        }

        if magnitude > self.config.warning_rate() {
            self.counter.increment(&obs.venue, &obs.symbol);
            self.emit_alert(obs, hedge_core::AlertLevel::Warning);
            return ObservationOutcome {
                triggers_rescan: false,
            };
        }

        self.counter.reset(&obs.venue, &obs.symbol);
        ObservationOutcome {
            triggers_rescan: false,
        }
    }

    fn emit_alert(&self, obs: &FundingObservation, level: hedge_core::AlertLevel) {
        let message = format!(
            "{} funding rate {} on {}:{}",
            level, obs.rate, obs.venue, obs.symbol
        );
        match level {
            hedge_core::AlertLevel::Critical => warn!(%message, "critical funding alert"),
            hedge_core::AlertLevel::Warning => debug!(%message, "warning funding alert"),
        }
        Metrics.record_alert(level);
        let _ = self.events.send(Event::Alert {
            level,
            venue: obs.venue.clone(),
            symbol: obs.symbol.clone(),
            rate: obs.rate,
            message,
            ts: Utc::now(),
        });
    }

    /// Runs the common-symbol arbitrage scan across every venue currently
    /// present in `store`. Requires at least two venues with data;
    /// otherwise returns no opportunities.
    pub fn scan_arbitrage(&self, store: &MarketStore) -> Vec<Event> {
        let symbols = store.common_symbols();
        let venues = store.venues();
        if venues.len() < 2 {
            return Vec::new();
        }

        let mut opportunities = Vec::new();
        for symbol in symbols {
            let rates: Vec<(VenueId, Rate)> = venues
                .iter()
                .filter_map(|venue| {
                    store
                        .latest_funding(venue, &symbol)
                        .map(|obs| (venue.clone(), obs.rate))
                })
                .collect();
            if rates.len() < 2 {
                continue;
            }

            // arg min/max with a lexicographically-smaller-venue tie-break
            //: ties on rate never fall to the largest venue id.
            let min_rate = rates.iter().map(|(_, r)| *r).min().expect("len >= 2");
            let min_venue = rates
                .iter()
                .filter(|(_, r)| *r == min_rate)
                .map(|(v, _)| v.clone())
                .min()
                .expect("len >= 2");
            let max_rate = rates.iter().map(|(_, r)| *r).max().expect("len >= 2");
            let max_venue = rates
                .iter()
                .filter(|(_, r)| *r == max_rate)
                .map(|(v, _)| v.clone())
                .min()
                .expect("len >= 2");

            let spread = max_rate - min_rate;
            if spread.inner() > self.config.arbitrage {
                info!(%symbol, %min_venue, %max_venue, %spread, "arbitrage opportunity");
                Metrics.record_arbitrage_opportunity(&symbol.to_string());
                let event = Event::Arbitrage {
                    symbol,
                    long_venue: min_venue,
                    short_venue: max_venue,
                    long_rate: min_rate,
                    short_rate: max_rate,
                    spread,
                    ts: Utc::now(),
                };
                let _ = self.events.send(event.clone());
                opportunities.push(event);
            }
        }
        opportunities
    }
}
