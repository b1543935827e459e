//! A venue-agnostic reconnect-with-backoff driver for `subscribe_stream`.
//!
//! Concrete adapters provide a `connect` closure that opens whatever
//! transport the venue uses and returns a stream of events; this driver
//! owns the retry loop, exponential backoff with jitter, and sequential
//! delivery into a channel — a reusable driver any adapter's
//! `subscribe_stream` can delegate to instead of hand-rolling its own
//! reconnect loop.

use std::future::Future;
use std::time::Duration;

use futures_util::Stream;
use futures_util::StreamExt;
use hedge_core::StreamEvent;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tracing::{error, warn};

use crate::error::AdapterResult;
use crate::stream::StreamHandle;

/// Backoff parameters for a reconnecting stream.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// `base * 2^(attempt-1)`, capped at `max_backoff`, plus 0-1000ms jitter.
#[must_use]
pub fn calculate_backoff_delay(cfg: &ReconnectConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = cfg
        .initial_backoff
        .saturating_mul(1u32 << exponent)
        .min(cfg.max_backoff);
    let jitter_ms = rand::thread_rng().gen_range(0..1000);
    delay + Duration::from_millis(jitter_ms)
}

/// Drives `connect` in a loop: on success, forwards every item of the
/// returned stream into the channel until it ends or errors; on any
/// failure (connect error, stream error, stream end), backs off and
/// reconnects. Returns immediately with a `StreamHandle`; the loop runs on
/// a spawned task until `shutdown()` is called on the handle.
pub fn spawn_reconnecting<C, Fut, S>(cfg: ReconnectConfig, mut connect: C) -> StreamHandle
where
    C: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = AdapterResult<S>> + Send,
    S: Stream<Item = AdapterResult<StreamEvent>> + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1024);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut attempt = 0u32;
        loop {
            if *shutdown_rx.borrow() {
                return;
            }

            match connect().await {
                Ok(mut stream) => {
                    attempt = 0;
                    loop {
                        tokio::select! {
                            item = stream.next() => {
                                match item {
                                    Some(Ok(event)) => {
                                        if tx.send(event).await.is_err() {
                                            return;
                                        }
                                    }
                                    Some(Err(err)) => {
                                        error!(?err, "venue stream error");
                                        break;
                                    }
                                    None => {
                                        warn!("venue stream ended");
                                        break;
                                    }
                                }
                            }
                            _ = shutdown_rx.changed() => {
                                if *shutdown_rx.borrow() {
                                    return;
                                }
                            }
                        }
                    }
                }
                Err(err) => {
                    error!(?err, "venue stream connect failed");
                }
            }

            attempt += 1;
            let delay = calculate_backoff_delay(&cfg, attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting venue stream");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return;
                    }
                }
            }
        }
    });

    StreamHandle { rx, shutdown_tx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let cfg = ReconnectConfig {
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        };
        let d1 = calculate_backoff_delay(&cfg, 1).as_millis();
        let d2 = calculate_backoff_delay(&cfg, 2).as_millis();
        let d5 = calculate_backoff_delay(&cfg, 5).as_millis();
        assert!((5000..6000).contains(&d1));
        assert!((10000..11000).contains(&d2));
        // 5s * 2^4 = 80s, capped to 60s.
        assert!((60000..61000).contains(&d5));
    }
}
