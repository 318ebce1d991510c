//! In-memory store fake for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StreamStore;
use super::models::{
    AlertRow, EquipmentRow, MetricRow, NewAnnotation, ProductionCount, QualityRow,
};
use crate::error::StreamError;

/// Test double backed by in-memory row vectors.
///
/// Set `fail_polls` to make every poll read fail with
/// [`StreamError::Store`], simulating an unreachable database.
#[derive(Debug, Default)]
pub struct FakeStore {
    /// Metric rows served by `metrics_after`.
    pub metrics: Mutex<Vec<MetricRow>>,
    /// Alert rows served by `alerts_after` and `active_alerts`.
    pub alerts: Mutex<Vec<AlertRow>>,
    /// Quality rows served by `quality_after`.
    pub quality: Mutex<Vec<QualityRow>>,
    /// Equipment rows served by status/OEE reads.
    pub equipment: Mutex<Vec<EquipmentRow>>,
    /// Production counts served by `production_counts`.
    pub production: Mutex<Vec<ProductionCount>>,
    /// When `true`, every poll read fails.
    pub fail_polls: AtomicBool,
    annotation_seq: AtomicI64,
}

impl FakeStore {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poll_guard(&self, category: &str) -> Result<(), StreamError> {
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(StreamError::Store(format!("{category}: connection refused")));
        }
        Ok(())
    }

    fn locked<T: Clone>(rows: &Mutex<Vec<T>>) -> Vec<T> {
        rows.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

fn newest_first_capped<T, F>(mut rows: Vec<T>, limit: i64, timestamp: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|r| std::cmp::Reverse(timestamp(r)));
    rows.truncate(usize::try_from(limit).unwrap_or(0));
    rows
}

#[async_trait]
impl StreamStore for FakeStore {
    async fn metrics_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MetricRow>, StreamError> {
        self.poll_guard("metrics")?;
        let rows = Self::locked(&self.metrics)
            .into_iter()
            .filter(|r| r.recorded_at > watermark)
            .collect();
        Ok(newest_first_capped(rows, limit, |r| r.recorded_at))
    }

    async fn alerts_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AlertRow>, StreamError> {
        self.poll_guard("alerts")?;
        let rows = Self::locked(&self.alerts)
            .into_iter()
            .filter(|r| r.created_at > watermark)
            .collect();
        Ok(newest_first_capped(rows, limit, |r| r.created_at))
    }

    async fn quality_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QualityRow>, StreamError> {
        self.poll_guard("quality")?;
        let rows = Self::locked(&self.quality)
            .into_iter()
            .filter(|r| r.recorded_at > watermark)
            .collect();
        Ok(newest_first_capped(rows, limit, |r| r.recorded_at))
    }

    async fn equipment_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EquipmentRow>, StreamError> {
        self.poll_guard("equipment")?;
        let rows = Self::locked(&self.equipment)
            .into_iter()
            .filter(|r| r.updated_at > watermark)
            .collect();
        Ok(newest_first_capped(rows, limit, |r| r.updated_at))
    }

    async fn acknowledge_alert(
        &self,
        alert_id: i64,
        _acknowledged_by: Option<&str>,
    ) -> Result<Option<AlertRow>, StreamError> {
        let Ok(mut alerts) = self.alerts.lock() else {
            return Err(StreamError::Store("lock poisoned".to_string()));
        };
        for alert in alerts.iter_mut() {
            if alert.id == alert_id {
                alert.acknowledged = true;
                return Ok(Some(alert.clone()));
            }
        }
        Ok(None)
    }

    async fn update_equipment_status(
        &self,
        equipment_id: &str,
        status: &str,
    ) -> Result<Option<EquipmentRow>, StreamError> {
        let Ok(mut equipment) = self.equipment.lock() else {
            return Err(StreamError::Store("lock poisoned".to_string()));
        };
        for row in equipment.iter_mut() {
            if row.id == equipment_id {
                row.status = status.to_string();
                row.updated_at = Utc::now();
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn create_annotation(&self, _annotation: &NewAnnotation) -> Result<i64, StreamError> {
        Ok(self.annotation_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn current_oee(
        &self,
        equipment_id: Option<&str>,
    ) -> Result<Vec<EquipmentRow>, StreamError> {
        Ok(Self::locked(&self.equipment)
            .into_iter()
            .filter(|r| equipment_id.is_none_or(|id| r.id == id))
            .collect())
    }

    async fn active_alerts(&self) -> Result<Vec<AlertRow>, StreamError> {
        Ok(Self::locked(&self.alerts)
            .into_iter()
            .filter(|r| !r.acknowledged)
            .collect())
    }

    async fn equipment_status(
        &self,
        equipment_ids: Option<&[String]>,
    ) -> Result<Vec<EquipmentRow>, StreamError> {
        Ok(Self::locked(&self.equipment)
            .into_iter()
            .filter(|r| equipment_ids.is_none_or(|ids| ids.contains(&r.id)))
            .collect())
    }

    async fn production_counts(
        &self,
        line_id: Option<&str>,
        _since: DateTime<Utc>,
    ) -> Result<Vec<ProductionCount>, StreamError> {
        Ok(Self::locked(&self.production)
            .into_iter()
            .filter(|r| line_id.is_none_or(|id| r.line_id == id))
            .collect())
    }
}
