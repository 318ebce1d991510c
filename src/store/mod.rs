//! Store boundary: recency-ordered reads and point writes against the
//! manufacturing database.
//!
//! All persistence access goes through the [`StreamStore`] trait so
//! pollers and the dispatcher can be tested against an in-memory fake.
//! The production implementation is [`postgres::PostgresStore`].

pub mod models;
pub mod postgres;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StreamError;
use models::{AlertRow, EquipmentRow, MetricRow, NewAnnotation, ProductionCount, QualityRow};

/// Persistent store the streaming gateway polls and writes to.
///
/// Reads used by pollers return rows with timestamp strictly greater
/// than the caller's watermark, newest first, capped at `limit`.
#[async_trait]
pub trait StreamStore: Send + Sync + std::fmt::Debug {
    /// Fetches metric rows recorded after `watermark`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn metrics_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MetricRow>, StreamError>;

    /// Fetches alert rows created after `watermark`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn alerts_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AlertRow>, StreamError>;

    /// Fetches quality check rows recorded after `watermark`, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn quality_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QualityRow>, StreamError>;

    /// Fetches equipment rows whose status changed after `watermark`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn equipment_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EquipmentRow>, StreamError>;

    /// Marks an alert acknowledged. Returns the acknowledged row, or
    /// `None` when no such alert exists.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn acknowledge_alert(
        &self,
        alert_id: i64,
        acknowledged_by: Option<&str>,
    ) -> Result<Option<AlertRow>, StreamError>;

    /// Updates an equipment status. Returns the updated row, or `None`
    /// when no such equipment exists.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn update_equipment_status(
        &self,
        equipment_id: &str,
        status: &str,
    ) -> Result<Option<EquipmentRow>, StreamError>;

    /// Inserts an annotation, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<i64, StreamError>;

    /// Returns current equipment rows, optionally restricted to one
    /// equipment id, for OEE reporting.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn current_oee(
        &self,
        equipment_id: Option<&str>,
    ) -> Result<Vec<EquipmentRow>, StreamError>;

    /// Returns unacknowledged alerts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn active_alerts(&self) -> Result<Vec<AlertRow>, StreamError>;

    /// Returns equipment rows, optionally restricted to the given ids.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn equipment_status(
        &self,
        equipment_ids: Option<&[String]>,
    ) -> Result<Vec<EquipmentRow>, StreamError>;

    /// Returns units produced per line since `since`, optionally
    /// restricted to one line.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Store`] on database failure.
    async fn production_counts(
        &self,
        line_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProductionCount>, StreamError>;
}
