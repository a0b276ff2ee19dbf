//! Event bus for the relay.
//!
//! All relay components communicate through publishing and subscribing to
//! events. The bus uses a broadcast channel so a slow subscriber can lag
//! and drop events without ever blocking a publisher.

use tokio::sync::broadcast;

use crate::event::{EventMetadata, RelayEvent};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Broadcast event bus for relay events.
///
/// Supports:
/// - Publishing events keyed by an origin routing key
/// - Subscribing to all events
/// - Filtered subscriptions for specific event kinds
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast channel sender
    tx: broadcast::Sender<(RelayEvent, EventMetadata)>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    ///
    /// The capacity determines how many events are buffered for slow
    /// subscribers before they start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event keyed by the given origin.
    ///
    /// Returns `true` if there was at least one subscriber; an event with
    /// no subscribers is discarded.
    pub fn publish(&self, event: RelayEvent, origin: impl Into<String>) -> bool {
        self.publish_with_metadata(event, EventMetadata::new(origin))
    }

    /// Publish an event with pre-built metadata.
    pub fn publish_with_metadata(&self, event: RelayEvent, metadata: EventMetadata) -> bool {
        self.tx.send((event, metadata)).is_ok()
    }

    /// Subscribe to all events.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// The filter is a function that returns `true` for events to receive;
    /// only matching events are delivered through the returned receiver.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&RelayEvent) -> bool + Send + 'static,
    {
        FilteredReceiver {
            rx: self.tx.subscribe(),
            filter,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for all events from the bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(RelayEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` when the bus is closed. A lagged receiver skips the
    /// missed events and keeps receiving.
    pub async fn recv(&mut self) -> Option<(RelayEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("event bus subscriber lagged, skipped {} events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<(RelayEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver for filtered events from the bus.
pub struct FilteredReceiver<F>
where
    F: Fn(&RelayEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(RelayEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&RelayEvent) -> bool + Send,
{
    /// Receive the next event matching the filter.
    ///
    /// Returns `None` when the bus is closed.
    pub async fn recv(&mut self) -> Option<(RelayEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<(RelayEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }
}
