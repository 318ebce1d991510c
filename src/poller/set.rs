//! Per-category pollers feeding the pub/sub core.
//!
//! Each category runs on its own spawned task with its own interval and
//! watermark, so a slow or failing category never delays another. The
//! watermark only advances on a successful poll; a failed poll retries
//! the same window on the next tick.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::mapping;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::store::StreamStore;
use crate::stream::StreamService;
use crate::telemetry::Telemetry;

/// Poll intervals and per-poll row caps.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Interval between metric polls.
    pub metric_interval: Duration,
    /// Interval between alert polls.
    pub alert_interval: Duration,
    /// Interval between quality polls.
    pub quality_interval: Duration,
    /// Interval between equipment polls.
    pub equipment_interval: Duration,
    /// Delay before the first poll of every category.
    pub startup_delay: Duration,
    /// Row cap per metric poll.
    pub metric_limit: i64,
    /// Row cap per alert poll.
    pub alert_limit: i64,
    /// Row cap per quality poll.
    pub quality_limit: i64,
    /// Row cap per equipment poll.
    pub equipment_limit: i64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            metric_interval: Duration::from_secs(5),
            alert_interval: Duration::from_secs(3),
            quality_interval: Duration::from_secs(10),
            equipment_interval: Duration::from_secs(15),
            startup_delay: Duration::from_secs(3),
            metric_limit: 10,
            alert_limit: 5,
            quality_limit: 5,
            equipment_limit: 10,
        }
    }
}

impl PollerSettings {
    /// Builds settings from the gateway configuration.
    #[must_use]
    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            metric_interval: Duration::from_secs(config.metric_poll_secs),
            alert_interval: Duration::from_secs(config.alert_poll_secs),
            quality_interval: Duration::from_secs(config.quality_poll_secs),
            equipment_interval: Duration::from_secs(config.equipment_poll_secs),
            startup_delay: Duration::from_secs(config.poll_startup_delay_secs),
            ..Self::default()
        }
    }
}

/// Polled event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCategory {
    /// Process metrics.
    Metric,
    /// Alerts.
    Alert,
    /// Quality checks.
    Quality,
    /// Equipment status changes.
    Equipment,
}

impl PollCategory {
    /// Category name used in logs and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Alert => "alert",
            Self::Quality => "quality",
            Self::Equipment => "equipment",
        }
    }

    fn interval(&self, settings: &PollerSettings) -> Duration {
        match self {
            Self::Metric => settings.metric_interval,
            Self::Alert => settings.alert_interval,
            Self::Quality => settings.quality_interval,
            Self::Equipment => settings.equipment_interval,
        }
    }

    fn limit(&self, settings: &PollerSettings) -> i64 {
        match self {
            Self::Metric => settings.metric_limit,
            Self::Alert => settings.alert_limit,
            Self::Quality => settings.quality_limit,
            Self::Equipment => settings.equipment_limit,
        }
    }
}

/// The set of per-category poller tasks.
#[derive(Debug)]
pub struct PollerSet {
    store: Arc<dyn StreamStore>,
    stream: Arc<StreamService>,
    telemetry: Arc<Telemetry>,
    settings: PollerSettings,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PollerSet {
    /// Creates a stopped poller set.
    #[must_use]
    pub fn new(
        store: Arc<dyn StreamStore>,
        stream: Arc<StreamService>,
        telemetry: Arc<Telemetry>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            store,
            stream,
            telemetry,
            settings,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns one polling task per category. Watermarks start at the
    /// current time, so only rows recorded after startup are streamed.
    pub fn start(&self) {
        let categories = [
            PollCategory::Metric,
            PollCategory::Alert,
            PollCategory::Quality,
            PollCategory::Equipment,
        ];
        let mut spawned = Vec::with_capacity(categories.len());
        for category in categories {
            spawned.push(self.spawn_poller(category));
        }
        if let Ok(mut handles) = self.handles.lock() {
            for old in handles.drain(..) {
                old.abort();
            }
            *handles = spawned;
        }
    }

    /// Aborts all polling tasks. Safe to call when not started.
    pub fn stop(&self) {
        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }

    fn spawn_poller(&self, category: PollCategory) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let stream = Arc::clone(&self.stream);
        let telemetry = Arc::clone(&self.telemetry);
        let interval = category.interval(&self.settings);
        let limit = category.limit(&self.settings);
        let startup_delay = self.settings.startup_delay;

        tokio::spawn(async move {
            tokio::time::sleep(startup_delay).await;
            let mut watermark = Utc::now();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match poll_once(&*store, &stream, &telemetry, category, watermark, limit).await {
                    Ok((new_watermark, published)) => {
                        watermark = new_watermark;
                        if published > 0 {
                            tracing::debug!(
                                category = category.as_str(),
                                published,
                                "poll published events"
                            );
                        }
                    }
                    Err(err) => {
                        // Watermark unchanged: the same window is
                        // retried on the next tick.
                        telemetry.poll_error();
                        tracing::warn!(
                            category = category.as_str(),
                            error = %err,
                            "poll failed, will retry"
                        );
                    }
                }
            }
        })
    }
}

impl Drop for PollerSet {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs a single poll cycle for one category.
///
/// Fetches rows newer than `watermark` (newest first, capped at
/// `limit`), publishes each as an event in fetch order, and returns the
/// advanced watermark together with the number of events published.
///
/// # Errors
///
/// Returns [`StreamError::TransientSource`] when the store read fails;
/// the caller keeps the previous watermark.
pub async fn poll_once(
    store: &dyn StreamStore,
    stream: &StreamService,
    telemetry: &Telemetry,
    category: PollCategory,
    watermark: DateTime<Utc>,
    limit: i64,
) -> Result<(DateTime<Utc>, usize), StreamError> {
    let transient = |err: StreamError| StreamError::TransientSource {
        category: category.as_str().to_string(),
        message: err.to_string(),
    };

    let (events, newest) = match category {
        PollCategory::Metric => {
            let rows = store.metrics_after(watermark, limit).await.map_err(transient)?;
            let newest = rows.first().map(|r| r.recorded_at);
            (rows.iter().map(mapping::metric_event).collect::<Vec<_>>(), newest)
        }
        PollCategory::Alert => {
            let rows = store.alerts_after(watermark, limit).await.map_err(transient)?;
            let newest = rows.first().map(|r| r.created_at);
            (rows.iter().map(mapping::alert_event).collect(), newest)
        }
        PollCategory::Quality => {
            let rows = store.quality_after(watermark, limit).await.map_err(transient)?;
            let newest = rows.first().map(|r| r.recorded_at);
            (rows.iter().map(mapping::quality_event).collect(), newest)
        }
        PollCategory::Equipment => {
            let rows = store.equipment_after(watermark, limit).await.map_err(transient)?;
            let newest = rows.first().map(|r| r.updated_at);
            (rows.iter().map(mapping::equipment_event).collect(), newest)
        }
    };

    let published = events.len();
    for event in events {
        telemetry.event_published();
        let _ = stream.publish(event).await;
    }

    Ok((newest.unwrap_or(watermark), published))
}
