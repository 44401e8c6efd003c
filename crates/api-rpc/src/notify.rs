//! Broadcast notifier
//!
//! Thin wrapper over `tokio::sync::broadcast`: publishing never blocks,
//! events are dropped when nobody listens, and slow receivers observe
//! `RecvError::Lagged` and skip the oldest events. Each RPC subscription
//! holds its own receiver and filters by audience.

use tokio::sync::broadcast;
use waitroom_core::domain::{Audience, QueueEvent};
use waitroom_core::port::Notifier;

/// Event plus its addressee
pub type Delivery = (Audience, QueueEvent);

/// Default ring-buffer size shared by all subscribers
pub const DEFAULT_NOTIFY_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Delivery>,
}

impl BroadcastNotifier {
    /// Minimum capacity is 1 (clamped)
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// A receiver only sees events published after it subscribed
    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_CAPACITY)
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, audience: Audience, event: QueueEvent) {
        let _ = self.tx.send((audience, event));
    }
}
