//! Cooperative cancellation for an in-flight reply.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation flag shared between the caller and a reply stream.
///
/// Cancelling is idempotent. The stream checks the flag before yielding each
/// fragment and races it against the next transport chunk, so a cancelled
/// session stops without waiting for more data.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Safe to call more than once.
    pub fn cancel(&self) {
        if !self.tx.send_replace(true) {
            tracing::debug!("reply cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only resolves on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
