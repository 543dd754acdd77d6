//! Outbound channels of live WebSocket connections

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

/// Frames buffered per connection before new ones are dropped
pub const OUTBOUND_BUFFER: usize = 64;

/// Serialized frames waiting for one connection's writer task
pub type Frame = Arc<str>;

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    senders: Arc<DashMap<Uuid, mpsc::Sender<Frame>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand back the receiving end of its channel
    pub fn register(&self, player_id: Uuid) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        self.senders.insert(player_id, tx);
        rx
    }

    pub fn unregister(&self, player_id: Uuid) {
        self.senders.remove(&player_id);
    }

    /// Queue a frame without waiting. Returns false if it was dropped.
    pub fn send(&self, player_id: Uuid, frame: Frame) -> bool {
        let Some(tx) = self.senders.get(&player_id) else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(player_id = %player_id, "Outbound buffer full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
