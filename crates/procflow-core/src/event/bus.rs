//! Broadcast event bus for distributing `ProcessEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`, the `EventBus` supports multiple
//! concurrent subscribers. Publishing with no active subscribers is a no-op.

use procflow_types::event::ProcessEvent;
use tokio::sync::broadcast;

/// Multi-consumer event bus for engine events.
///
/// Cloning the bus clones the sender, so the executor, observers and any
/// number of subscribers can share one channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProcessEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    ///
    /// `EngineConfig::event_bus_capacity` defaults to 1024.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers it reached.
    ///
    /// With no subscribers the event is dropped and 0 is returned.
    pub fn publish(&self, event: ProcessEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.receiver_count())
            .finish()
    }
}
