//! Connection hub — the set of connected display and game-master clients.
//!
//! DESIGN
//! ======
//! Owned by the prop actor, never shared. Each client is a bounded outbound
//! channel drained by its WebSocket task. Broadcast is best-effort: a full
//! channel skips that client, a closed channel removes it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use uuid::Uuid;

/// Outbound frame channel for one client. Frames are pre-serialized JSON.
pub type ClientTx = mpsc::Sender<Arc<str>>;

/// Per-client outbound buffer.
pub const CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct Hub {
    clients: HashMap<Uuid, ClientTx>,
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, client_id: Uuid, tx: ClientTx) {
        self.clients.insert(client_id, tx);
    }

    pub fn part(&mut self, client_id: Uuid) -> bool {
        self.clients.remove(&client_id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Send to one client. Returns false if the client is gone.
    pub fn send_to(&mut self, client_id: Uuid, frame: Arc<str>) -> bool {
        let Some(tx) = self.clients.get(&client_id) else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => {
                self.clients.remove(&client_id);
                false
            }
        }
    }

    /// Send to every client, pruning closed ones. Returns the number reached.
    pub fn broadcast(&mut self, frame: &Arc<str>) -> usize {
        let mut reached = 0;
        self.clients.retain(|client_id, tx| match tx.try_send(Arc::clone(frame)) {
            Ok(()) => {
                reached += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(%client_id, "hub: client lagging, frame skipped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        reached
    }

    pub fn clear(&mut self) {
        self.clients.clear();
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
