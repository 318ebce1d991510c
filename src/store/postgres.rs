//! PostgreSQL implementation of the store boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::StreamStore;
use super::models::{
    AlertRow, EquipmentRow, MetricRow, NewAnnotation, ProductionCount, QualityRow,
};
use crate::config::StreamConfig;
use crate::error::StreamError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store with an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError::Store`] when the pool cannot be built.
    pub async fn connect(config: &StreamConfig) -> Result<Self, StreamError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(|e| StreamError::Store(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

type MetricTuple = (
    i64,
    String,
    Option<String>,
    String,
    f64,
    Option<String>,
    DateTime<Utc>,
);

type AlertTuple = (i64, String, String, String, f64, f64, bool, DateTime<Utc>);

type QualityTuple = (i64, String, String, f64, f64, f64, DateTime<Utc>);

type EquipmentTuple = (String, String, String, f64, f64, f64, DateTime<Utc>);

fn metric_from(row: MetricTuple) -> MetricRow {
    let (id, equipment_id, line_id, name, value, unit, recorded_at) = row;
    MetricRow {
        id,
        equipment_id,
        line_id,
        name,
        value,
        unit,
        recorded_at,
    }
}

fn alert_from(row: AlertTuple) -> AlertRow {
    let (id, equipment_id, alert_type, message, value, threshold, acknowledged, created_at) = row;
    AlertRow {
        id,
        equipment_id,
        alert_type,
        message,
        value,
        threshold,
        acknowledged,
        created_at,
    }
}

fn quality_from(row: QualityTuple) -> QualityRow {
    let (id, equipment_id, parameter, actual, target, tolerance, recorded_at) = row;
    QualityRow {
        id,
        equipment_id,
        parameter,
        actual,
        target,
        tolerance,
        recorded_at,
    }
}

fn equipment_from(row: EquipmentTuple) -> EquipmentRow {
    let (id, name, status, availability, performance, quality, updated_at) = row;
    EquipmentRow {
        id,
        name,
        status,
        availability,
        performance,
        quality,
        updated_at,
    }
}

#[async_trait]
impl StreamStore for PostgresStore {
    async fn metrics_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MetricRow>, StreamError> {
        let rows = sqlx::query_as::<_, MetricTuple>(
            "SELECT id, equipment_id, line_id, name, value, unit, recorded_at \
             FROM metrics WHERE recorded_at > $1 \
             ORDER BY recorded_at DESC LIMIT $2",
        )
        .bind(watermark)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(metric_from).collect())
    }

    async fn alerts_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AlertRow>, StreamError> {
        let rows = sqlx::query_as::<_, AlertTuple>(
            "SELECT id, equipment_id, alert_type, message, value, threshold, acknowledged, created_at \
             FROM alerts WHERE created_at > $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(watermark)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(alert_from).collect())
    }

    async fn quality_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QualityRow>, StreamError> {
        let rows = sqlx::query_as::<_, QualityTuple>(
            "SELECT id, equipment_id, parameter, actual, target, tolerance, recorded_at \
             FROM quality_checks WHERE recorded_at > $1 \
             ORDER BY recorded_at DESC LIMIT $2",
        )
        .bind(watermark)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(quality_from).collect())
    }

    async fn equipment_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EquipmentRow>, StreamError> {
        let rows = sqlx::query_as::<_, EquipmentTuple>(
            "SELECT id, name, status, availability, performance, quality, updated_at \
             FROM equipment WHERE updated_at > $1 \
             ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(watermark)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(equipment_from).collect())
    }

    async fn acknowledge_alert(
        &self,
        alert_id: i64,
        acknowledged_by: Option<&str>,
    ) -> Result<Option<AlertRow>, StreamError> {
        let row = sqlx::query_as::<_, AlertTuple>(
            "UPDATE alerts SET acknowledged = TRUE, acknowledged_by = $2, acknowledged_at = NOW() \
             WHERE id = $1 \
             RETURNING id, equipment_id, alert_type, message, value, threshold, acknowledged, created_at",
        )
        .bind(alert_id)
        .bind(acknowledged_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(row.map(alert_from))
    }

    async fn update_equipment_status(
        &self,
        equipment_id: &str,
        status: &str,
    ) -> Result<Option<EquipmentRow>, StreamError> {
        let row = sqlx::query_as::<_, EquipmentTuple>(
            "UPDATE equipment SET status = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, name, status, availability, performance, quality, updated_at",
        )
        .bind(equipment_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(row.map(equipment_from))
    }

    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<i64, StreamError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO annotations (equipment_id, line_id, text, author) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(annotation.equipment_id.as_deref())
        .bind(annotation.line_id.as_deref())
        .bind(&annotation.text)
        .bind(annotation.author.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(id)
    }

    async fn current_oee(
        &self,
        equipment_id: Option<&str>,
    ) -> Result<Vec<EquipmentRow>, StreamError> {
        let rows = if let Some(id) = equipment_id {
            sqlx::query_as::<_, EquipmentTuple>(
                "SELECT id, name, status, availability, performance, quality, updated_at \
                 FROM equipment WHERE id = $1",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, EquipmentTuple>(
                "SELECT id, name, status, availability, performance, quality, updated_at \
                 FROM equipment ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(equipment_from).collect())
    }

    async fn active_alerts(&self) -> Result<Vec<AlertRow>, StreamError> {
        let rows = sqlx::query_as::<_, AlertTuple>(
            "SELECT id, equipment_id, alert_type, message, value, threshold, acknowledged, created_at \
             FROM alerts WHERE acknowledged = FALSE \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(alert_from).collect())
    }

    async fn equipment_status(
        &self,
        equipment_ids: Option<&[String]>,
    ) -> Result<Vec<EquipmentRow>, StreamError> {
        let rows = if let Some(ids) = equipment_ids {
            sqlx::query_as::<_, EquipmentTuple>(
                "SELECT id, name, status, availability, performance, quality, updated_at \
                 FROM equipment WHERE id = ANY($1) ORDER BY id",
            )
            .bind(ids)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, EquipmentTuple>(
                "SELECT id, name, status, availability, performance, quality, updated_at \
                 FROM equipment ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(equipment_from).collect())
    }

    async fn production_counts(
        &self,
        line_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProductionCount>, StreamError> {
        let rows = if let Some(line) = line_id {
            sqlx::query_as::<_, (String, i64)>(
                "SELECT line_id, COALESCE(SUM(units), 0) FROM production_counts \
                 WHERE recorded_at >= $1 AND line_id = $2 GROUP BY line_id",
            )
            .bind(since)
            .bind(line)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, (String, i64)>(
                "SELECT line_id, COALESCE(SUM(units), 0) FROM production_counts \
                 WHERE recorded_at >= $1 GROUP BY line_id ORDER BY line_id",
            )
            .bind(since)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StreamError::Store(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(line_id, units)| ProductionCount { line_id, units })
            .collect())
    }
}
