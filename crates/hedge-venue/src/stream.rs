//! The subscriber-facing half of a venue stream subscription.

use hedge_core::StreamEvent;
use tokio::sync::{mpsc, watch};

/// A running stream subscription. Dropping this does not stop the
/// underlying reconnect task — call `shutdown()` for a clean stop.
pub struct StreamHandle {
    pub(crate) rx: mpsc::Receiver<StreamEvent>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl StreamHandle {
    /// Receive the next event, sequentially per stream, in the order the
    /// adapter produced them.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Signal the reconnect loop to stop after the current connection
    /// attempt unwinds.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
