//! Periodic cross-venue balance equalization.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use hedge_core::{Event, UsdAmount, VenueId};
use hedge_venue::VenueAdapter;

use crate::config::RebalancerConfig;

struct VenueBalance {
    venue: VenueId,
    adapter: Arc<dyn VenueAdapter>,
    balance: Decimal,
}

/// Pulls `get_total_balance()` from every venue, classifies donors/needy
/// against the fleet average, and moves excess capital to deficit venues
/// via `VenueAdapter::transfer_to`.
pub struct Rebalancer {
    adapters: Vec<Arc<dyn VenueAdapter>>,
    config: RebalancerConfig,
    events: broadcast::Sender<Event>,
}

impl Rebalancer {
    #[must_use]
    pub fn new(
        adapters: Vec<Arc<dyn VenueAdapter>>,
        config: RebalancerConfig,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            adapters,
            config,
            events,
        }
    }

    /// Runs one rebalance sweep.
    pub async fn tick(&self) {
        let balances = self.collect_balances().await;
        if balances.len() < 2 {
            return;
        }

        let total: Decimal = balances.iter().map(|b| b.balance).sum();
        if total.is_zero() {
            return;
        }
        let count = Decimal::from(balances.len());
        let avg = total / count;

        let mut donors: Vec<(usize, Decimal)> = Vec::new();
        let mut needy: Vec<(usize, Decimal)> = Vec::new();
        for (idx, b) in balances.iter().enumerate() {
            let deviation = (b.balance - avg).abs() / total;
            if deviation <= self.config.rebalance_threshold {
                continue;
            }
            if b.balance > avg {
                donors.push((idx, b.balance - avg));
            } else {
                needy.push((idx, avg - b.balance));
            }
        }

        donors.sort_by(|a, b| b.1.cmp(&a.1));
        needy.sort_by(|a, b| b.1.cmp(&a.1));

        let mut needy = needy;
        for (donor_idx, mut donor_excess) in donors {
            while donor_excess > Decimal::ZERO {
                let Some((needy_pos, (recipient_idx, deficit))) = needy
                    .iter()
                    .enumerate()
                    .find(|(_, (_, d))| *d > Decimal::ZERO)
                    .map(|(pos, pair)| (pos, *pair))
                else {
                    break;
                };

                let amount = donor_excess.min(deficit);
                self.transfer(&balances[donor_idx], &balances[recipient_idx], amount)
                    .await;

                donor_excess -= amount;
                needy[needy_pos].1 -= amount;
            }
        }
    }

    async fn collect_balances(&self) -> Vec<VenueBalance> {
        let calls = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            async move {
                match adapter.get_total_balance().await {
                    Ok(balance) => Some(VenueBalance {
                        venue: adapter.venue_id(),
                        adapter: adapter.clone(),
                        balance,
                    }),
                    Err(err) => {
                        warn!(venue = %adapter.venue_id(), %err, "balance fetch failed");
                        None
                    }
                }
            }
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    async fn transfer(&self, donor: &VenueBalance, recipient: &VenueBalance, amount: Decimal) {
        match donor
            .adapter
            .transfer_to(recipient.adapter.as_ref(), amount, &self.config.asset)
            .await
        {
            Ok(()) => {
                info!(from = %donor.venue, to = %recipient.venue, %amount, "rebalance transfer");
                let _ = self.events.send(Event::RebalanceTransfer {
                    from_venue: donor.venue.clone(),
                    to_venue: recipient.venue.clone(),
                    amount: UsdAmount::new(amount),
                    ts: Utc::now(),
                });
            }
            Err(err) => {
                warn!(from = %donor.venue, to = %recipient.venue, %err, "rebalance transfer failed");
            }
        }
    }

    /// Spawns the periodic rebalance sweep on the current Tokio runtime.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval());
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}
