//! Row models for the manufacturing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A process metric row from the `metrics` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Equipment the reading belongs to.
    pub equipment_id: String,
    /// Production line, when the metric is line-scoped.
    pub line_id: Option<String>,
    /// Metric name (e.g. `"spindle_temperature"`).
    pub name: String,
    /// Measured value.
    pub value: f64,
    /// Unit of measure.
    pub unit: Option<String>,
    /// Recording timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// An alert row from the `alerts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Equipment the alert fired for.
    pub equipment_id: String,
    /// Alert kind (e.g. `"temperature_high"`).
    pub alert_type: String,
    /// Human-readable alert message.
    pub message: String,
    /// Reading that triggered the alert.
    pub value: f64,
    /// Threshold the reading breached.
    pub threshold: f64,
    /// Whether an operator has acknowledged the alert.
    pub acknowledged: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A quality check row from the `quality_checks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Equipment the check was performed on.
    pub equipment_id: String,
    /// Checked parameter (e.g. `"bore_diameter"`).
    pub parameter: String,
    /// Measured value.
    pub actual: f64,
    /// Nominal target value.
    pub target: f64,
    /// Allowed absolute deviation from target.
    pub tolerance: f64,
    /// Recording timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// An equipment row from the `equipment` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentRow {
    /// Equipment identifier (e.g. `"cnc-7"`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current status (`running`, `idle`, `maintenance`, `down`).
    pub status: String,
    /// Availability component of OEE, 0..=1.
    pub availability: f64,
    /// Performance component of OEE, 0..=1.
    pub performance: f64,
    /// Quality component of OEE, 0..=1.
    pub quality: f64,
    /// Last status change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl EquipmentRow {
    /// Overall equipment effectiveness: availability × performance ×
    /// quality.
    #[must_use]
    pub fn oee(&self) -> f64 {
        self.availability * self.performance * self.quality
    }
}

/// Units produced per line over a window, from `production_counts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionCount {
    /// Production line identifier.
    pub line_id: String,
    /// Units produced inside the queried window.
    pub units: i64,
}

/// Input for creating an annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    /// Equipment the annotation is attached to, if any.
    pub equipment_id: Option<String>,
    /// Production line the annotation is attached to, if any.
    pub line_id: Option<String>,
    /// Annotation body.
    pub text: String,
    /// Author, when the connection carries a user id.
    pub author: Option<String>,
}
