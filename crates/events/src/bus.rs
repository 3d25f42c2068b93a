//! In-process event bus backed by a `tokio::sync::broadcast` channel.

use parley_core::presence::PresenceChange;
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`PresenceChange`] events.
///
/// Shared via `Arc<EventBus>`. Any number of subscribers independently
/// receive every published event.
pub struct EventBus {
    sender: broadcast::Sender<PresenceChange>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it; zero subscribers
    /// is not an error.
    pub fn publish(&self, event: PresenceChange) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!("Presence event published with no subscribers");
                0
            }
        }
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceChange> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
