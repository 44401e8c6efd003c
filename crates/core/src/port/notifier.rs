// Notifier Port (Interface)

use crate::domain::{Audience, QueueEvent};

/// Real-time notification sink
///
/// Fire-and-forget: delivery failures are the transport's concern and never
/// propagate back into admission control.
pub trait Notifier: Send + Sync {
    fn publish(&self, audience: Audience, event: QueueEvent);
}

/// Drops every event (no transport attached)
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, _audience: Audience, _event: QueueEvent) {}
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every published event in order
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<(Audience, QueueEvent)>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<(Audience, QueueEvent)> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        /// Events addressed to (or broadcast to) `user_id`
        pub fn events_for(&self, user_id: &str) -> Vec<QueueEvent> {
            self.events()
                .into_iter()
                .filter(|(audience, _)| audience.includes(user_id))
                .map(|(_, event)| event)
                .collect()
        }

        pub fn names(&self) -> Vec<&'static str> {
            self.events().iter().map(|(_, e)| e.name()).collect()
        }

        pub fn clear(&self) {
            if let Ok(mut events) = self.events.lock() {
                events.clear();
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn publish(&self, audience: Audience, event: QueueEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push((audience, event));
            }
        }
    }
}
