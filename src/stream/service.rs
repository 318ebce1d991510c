//! Pub/sub core: subscription registry, ring buffer, publish fan-out.
//!
//! [`StreamService`] is constructed once at process bootstrap and handed
//! to transports and pollers by `Arc`. Background maintenance runs only
//! between explicit [`StreamService::start`] and [`StreamService::stop`]
//! calls, so shutdown is deterministic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::buffer::EventBuffer;
use super::subscription::Subscription;
use crate::domain::{StreamEvent, SubscriptionFilters, SubscriptionId};

/// Tunables for the pub/sub core.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Maximum number of buffered events (ring buffer capacity).
    pub buffer_capacity: usize,
    /// Maximum age of a buffered event before a maintenance sweep
    /// removes it.
    pub retention: Duration,
    /// Interval between maintenance sweeps.
    pub maintenance_interval: Duration,
    /// Capacity of each subscriber's delivery channel. Should be at
    /// least `buffer_capacity` so a full time-range replay cannot lag
    /// out its own head.
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            retention: Duration::from_secs(300),
            maintenance_interval: Duration::from_secs(60),
            channel_capacity: 1024,
        }
    }
}

/// Subscription registry and bounded event buffer with publish fan-out.
///
/// The registry and buffer are the only shared mutable state in the
/// system and are owned exclusively by this type.
#[derive(Debug)]
pub struct StreamService {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    buffer: std::sync::Arc<RwLock<EventBuffer>>,
    settings: StreamSettings,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl StreamService {
    /// Creates a stopped service with the given settings.
    #[must_use]
    pub fn new(settings: StreamSettings) -> Self {
        let buffer = EventBuffer::new(settings.buffer_capacity, settings.retention);
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            buffer: std::sync::Arc::new(RwLock::new(buffer)),
            settings,
            maintenance: Mutex::new(None),
        }
    }

    /// Registers a subscription and returns its id plus the consumer
    /// end of the delivery channel.
    ///
    /// When `filters.time_range` is present, every buffered event
    /// matching the filters is queued ascending by timestamp before the
    /// subscription goes live, so the consumer sees the replay ahead of
    /// any subsequently published event.
    pub async fn subscribe(
        &self,
        filters: SubscriptionFilters,
        user_id: Option<String>,
    ) -> (SubscriptionId, broadcast::Receiver<StreamEvent>) {
        let (subscription, receiver) =
            Subscription::new(filters, user_id, self.settings.channel_capacity);
        let id = subscription.id;

        if subscription.filters.time_range.is_some() {
            let replay = self.buffer.read().await.matching(&subscription.filters);
            for event in &replay {
                if let Err(err) = subscription.deliver(event) {
                    tracing::warn!(subscription = %id, error = %err, "replay delivery failed");
                    break;
                }
            }
            tracing::debug!(subscription = %id, replayed = replay.len(), "time-range replay");
        }

        self.subscriptions.write().await.insert(id, subscription);
        tracing::debug!(subscription = %id, "subscribed");
        (id, receiver)
    }

    /// Removes a subscription. Idempotent: unknown ids are a no-op.
    ///
    /// Removal closes the delivery channel, so no future event reaches
    /// the consumer; events already queued may still drain.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscriptions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = %id, "unsubscribed");
        }
        removed
    }

    /// Appends the event to the ring buffer and fans it out to every
    /// matching subscription.
    ///
    /// A failed delivery (consumer gone) is logged and never prevents
    /// delivery to the remaining subscriptions. Returns the number of
    /// subscribers the event was queued for.
    pub async fn publish(&self, event: StreamEvent) -> usize {
        self.buffer.write().await.push(event.clone());

        let subscriptions = self.subscriptions.read().await;
        let mut delivered = 0;
        for subscription in subscriptions.values() {
            if !subscription.filters.matches(&event) {
                continue;
            }
            match subscription.deliver(&event) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(event = %event.id, error = %err, "delivery failed");
                }
            }
        }
        delivered
    }

    /// Removes buffered events older than the retention window.
    /// Returns the number of events removed.
    pub async fn purge_expired(&self) -> usize {
        self.buffer.write().await.purge_expired(Utc::now())
    }

    /// Returns the number of live subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Returns the number of buffered events.
    pub async fn buffered_events(&self) -> usize {
        self.buffer.read().await.len()
    }

    /// Spawns the periodic maintenance task. Calling `start` on an
    /// already started service restarts the task.
    pub fn start(&self) {
        let buffer = std::sync::Arc::clone(&self.buffer);
        let interval = self.settings.maintenance_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = buffer.write().await.purge_expired(Utc::now());
                if purged > 0 {
                    tracing::debug!(purged, "maintenance sweep purged expired events");
                }
            }
        });
        if let Ok(mut slot) = self.maintenance.lock()
            && let Some(previous) = slot.replace(handle)
        {
            previous.abort();
        }
    }

    /// Stops the maintenance task. Safe to call when not started.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.maintenance.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
    }
}

impl Drop for StreamService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventCategory, Severity, TimeRange};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn small_settings() -> StreamSettings {
        StreamSettings {
            buffer_capacity: 1000,
            retention: Duration::from_secs(300),
            maintenance_interval: Duration::from_secs(60),
            channel_capacity: 1024,
        }
    }

    fn event(category: EventCategory) -> StreamEvent {
        StreamEvent::new(category, Utc::now(), json!({}))
    }

    #[tokio::test]
    async fn unfiltered_subscriber_sees_publish_order() {
        let service = StreamService::new(small_settings());
        let (_id, mut rx) = service
            .subscribe(SubscriptionFilters::default(), None)
            .await;

        let first = event(EventCategory::Metric);
        let second = event(EventCategory::Alert);
        assert_eq!(service.publish(first.clone()).await, 1);
        assert_eq!(service.publish(second.clone()).await, 1);

        let Ok(a) = rx.recv().await else {
            panic!("missing first event");
        };
        let Ok(b) = rx.recv().await else {
            panic!("missing second event");
        };
        assert_eq!(a.id, first.id);
        assert_eq!(b.id, second.id);
    }

    #[tokio::test]
    async fn type_filtered_subscriber_never_sees_other_categories() {
        let service = StreamService::new(small_settings());
        let filters = SubscriptionFilters {
            types: Some(vec![EventCategory::Alert]),
            ..Default::default()
        };
        let (_id, mut rx) = service.subscribe(filters, None).await;

        let _ = service.publish(event(EventCategory::Metric)).await;
        let alert = event(EventCategory::Alert);
        let _ = service.publish(alert.clone()).await;

        let Ok(received) = rx.recv().await else {
            panic!("missing alert");
        };
        assert_eq!(received.id, alert.id);
        assert_eq!(received.category, EventCategory::Alert);
    }

    #[tokio::test]
    async fn unsubscribe_stops_future_delivery() {
        let service = StreamService::new(small_settings());
        let (id, mut rx) = service
            .subscribe(SubscriptionFilters::default(), None)
            .await;

        assert!(service.unsubscribe(id).await);
        // Idempotent.
        assert!(!service.unsubscribe(id).await);

        let _ = service.publish(event(EventCategory::Metric)).await;
        // The channel is closed with nothing queued.
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn delivery_isolation_between_subscribers() {
        let service = StreamService::new(small_settings());
        let (_dead_id, dead_rx) = service
            .subscribe(SubscriptionFilters::default(), None)
            .await;
        let (_live_id, mut live_rx) = service
            .subscribe(SubscriptionFilters::default(), None)
            .await;
        drop(dead_rx);

        let published = event(EventCategory::Quality);
        let delivered = service.publish(published.clone()).await;
        assert_eq!(delivered, 1);

        let Ok(received) = live_rx.recv().await else {
            panic!("live subscriber lost the event");
        };
        assert_eq!(received.id, published.id);
    }

    #[tokio::test]
    async fn time_range_replays_ascending_before_live_events() {
        let service = StreamService::new(small_settings());
        let now = Utc::now();

        // Published newest-first, the order a poll batch arrives in.
        let newest = StreamEvent::new(EventCategory::Metric, now, json!({}));
        let oldest = StreamEvent::new(
            EventCategory::Metric,
            now - ChronoDuration::seconds(20),
            json!({}),
        );
        let middle = StreamEvent::new(
            EventCategory::Metric,
            now - ChronoDuration::seconds(10),
            json!({}),
        );
        let _ = service.publish(newest.clone()).await;
        let _ = service.publish(oldest.clone()).await;
        let _ = service.publish(middle.clone()).await;

        let filters = SubscriptionFilters {
            time_range: Some(TimeRange {
                start: now - ChronoDuration::seconds(30),
                end: now + ChronoDuration::seconds(30),
            }),
            ..Default::default()
        };
        let (_id, mut rx) = service.subscribe(filters, None).await;

        let live = StreamEvent::new(EventCategory::Metric, now, json!({"live": true}));
        let _ = service.publish(live.clone()).await;

        let mut ids = Vec::new();
        for _ in 0..4 {
            let Ok(received) = rx.recv().await else {
                panic!("missing replayed or live event");
            };
            ids.push(received.id);
        }
        assert_eq!(ids, vec![oldest.id, middle.id, newest.id, live.id]);
    }

    #[tokio::test]
    async fn replay_outside_range_is_skipped() {
        let service = StreamService::new(small_settings());
        let now = Utc::now();
        let stale = StreamEvent::new(
            EventCategory::Alert,
            now - ChronoDuration::seconds(120),
            json!({}),
        );
        let _ = service.publish(stale).await;

        let filters = SubscriptionFilters {
            time_range: Some(TimeRange {
                start: now - ChronoDuration::seconds(30),
                end: now,
            }),
            ..Default::default()
        };
        let (_id, mut rx) = service.subscribe(filters, None).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn buffer_drops_earliest_beyond_capacity() {
        let service = StreamService::new(StreamSettings {
            buffer_capacity: 1000,
            ..small_settings()
        });
        for _ in 0..1001 {
            let _ = service.publish(event(EventCategory::Metric)).await;
        }
        assert_eq!(service.buffered_events().await, 1000);
    }

    #[tokio::test]
    async fn purge_expired_empties_old_events() {
        let service = StreamService::new(small_settings());
        let old = StreamEvent::new(
            EventCategory::Metric,
            Utc::now() - ChronoDuration::seconds(600),
            json!({}),
        );
        let _ = service.publish(old).await;
        assert_eq!(service.buffered_events().await, 1);

        let purged = service.purge_expired().await;
        assert_eq!(purged, 1);
        assert_eq!(service.buffered_events().await, 0);
    }

    #[tokio::test]
    async fn severity_filter_matches_published_event() {
        let service = StreamService::new(small_settings());
        let filters = SubscriptionFilters {
            severity: Some(vec![Severity::Critical]),
            ..Default::default()
        };
        let (_id, mut rx) = service.subscribe(filters, None).await;

        let info = event(EventCategory::Alert).with_severity(Severity::Info);
        let critical = event(EventCategory::Alert).with_severity(Severity::Critical);
        let _ = service.publish(info).await;
        let _ = service.publish(critical.clone()).await;

        let Ok(received) = rx.recv().await else {
            panic!("missing critical alert");
        };
        assert_eq!(received.id, critical.id);
    }

    #[tokio::test]
    async fn start_and_stop_lifecycle() {
        let service = std::sync::Arc::new(StreamService::new(small_settings()));
        service.start();
        service.stop();
        // Stopping twice is harmless.
        service.stop();
    }
}
