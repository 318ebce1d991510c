//! A single registered subscription and its delivery channel.

use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::domain::{StreamEvent, SubscriptionFilters, SubscriptionId};
use crate::error::StreamError;

/// A live subscription owned by the [`crate::stream::StreamService`].
///
/// Delivery goes through a per-subscriber bounded broadcast channel: a
/// lagging consumer drops its oldest undelivered events (mirroring the
/// ring buffer's eviction policy) without ever blocking the publisher.
#[derive(Debug)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// Owning user, when the transport supplied one.
    pub user_id: Option<String>,
    /// Filters every published event is matched against.
    pub filters: SubscriptionFilters,
    sender: broadcast::Sender<StreamEvent>,
    last_event_id: Mutex<Option<String>>,
}

impl Subscription {
    /// Creates a subscription with a delivery channel of the given
    /// capacity, returning it together with the consumer end.
    #[must_use]
    pub fn new(
        filters: SubscriptionFilters,
        user_id: Option<String>,
        channel_capacity: usize,
    ) -> (Self, broadcast::Receiver<StreamEvent>) {
        let (sender, receiver) = broadcast::channel(channel_capacity);
        let subscription = Self {
            id: SubscriptionId::new(),
            user_id,
            filters,
            sender,
            last_event_id: Mutex::new(None),
        };
        (subscription, receiver)
    }

    /// Queues an event on the delivery channel.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Delivery`] when the consumer end has been
    /// dropped. The caller logs and moves on to the next subscriber.
    pub fn deliver(&self, event: &StreamEvent) -> Result<(), StreamError> {
        self.sender
            .send(event.clone())
            .map_err(|_| StreamError::Delivery(self.id))?;
        if let Ok(mut last) = self.last_event_id.lock() {
            *last = Some(event.id.clone());
        }
        Ok(())
    }

    /// Returns the id of the last event queued for this subscriber.
    #[must_use]
    pub fn last_event_id(&self) -> Option<String> {
        self.last_event_id.lock().ok().and_then(|g| g.clone())
    }

    /// Returns `true` if the consumer end is still attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}
