//! Broadcast hub for calendar lifecycle events.
//!
//! All WebSocket subscribers share a single broadcast group: every published
//! event reaches every connected client, with no per-user filtering. Delivery
//! is best-effort — there is no persistence or replay, and publishing never
//! fails the state mutation that triggered it.

use calbook_core::models::event::CalendarEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Process-wide fan-out channel for slot and booking lifecycle events.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<CalendarEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Join the shared group. The subscription ends when the receiver is
    /// dropped, which is how disconnecting clients leave the group.
    pub fn subscribe(&self) -> broadcast::Receiver<CalendarEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers, fire-and-forget.
    /// A send with no receivers is a no-op.
    pub fn publish(&self, event: CalendarEvent) {
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!("Broadcast calendar event to {} subscribers", receivers)
            }
            Err(_) => tracing::debug!("No calendar subscribers connected; event dropped"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
