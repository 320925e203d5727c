use courtside_types::events::{MatchId, StoreChange};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Fan-out of row-change notifications, backed by a broadcast channel.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, change: StoreChange) {
        // No receivers is not an error: nobody is watching this store.
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self, match_id: MatchId) -> Subscription {
        debug!(%match_id, "change feed subscription opened");
        Subscription {
            match_id,
            rx: self.tx.subscribe(),
        }
    }
}

/// Notifications for a single match. Dropping it (or calling
/// [`Subscription::unsubscribe`]) stops delivery.
pub struct Subscription {
    match_id: MatchId,
    rx: broadcast::Receiver<StoreChange>,
}

impl Subscription {
    /// Waits for the next change to this match. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<StoreChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.match_id == self.match_id => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(match_id = %self.match_id, missed, "change feed lagged");
                    return Some(StoreChange::lagged(self.match_id, missed));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`] for polling loops.
    pub fn try_next(&mut self) -> Option<StoreChange> {
        loop {
            match self.rx.try_recv() {
                Ok(change) if change.match_id == self.match_id => return Some(change),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(match_id = %self.match_id, missed, "change feed lagged");
                    return Some(StoreChange::lagged(self.match_id, missed));
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        debug!(match_id = %self.match_id, "change feed subscription closed");
    }
}
