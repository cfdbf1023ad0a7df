//! Typed event bus replacing custom DOM events.
//!
//! The original theme synchronized components with bubbling `cart:updated`
//! and `async-section-loaded` DOM events. Here the same notifications travel
//! over a `tokio::sync::broadcast` channel: publishers never block, delivery
//! order matches publish order, and a bus with no subscribers is fine.

use tokio::sync::broadcast;

use crate::api::types::CartPayload;

/// Notifications broadcast between theme components.
#[derive(Debug, Clone)]
pub enum ThemeEvent {
    /// The cart changed; carries the canonical count and the cart-like
    /// payload the mutation produced.
    CartUpdated { count: u32, cart: CartPayload },
    /// An asynchronously loaded section finished fetching.
    AsyncSectionLoaded {
        section_name: String,
        data: serde_json::Value,
    },
}

/// Broadcast bus shared by all controllers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ThemeEvent>,
}

impl EventBus {
    /// Create a bus able to buffer `capacity` undelivered events per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ThemeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn send(&self, event: ThemeEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}
