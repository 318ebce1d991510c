//! Row-to-event mapping with deterministic severity derivation.
//!
//! Severity and within-spec flags are pure functions of the row's
//! numeric fields, so replaying the same rows always produces the same
//! events.

use serde_json::json;

use crate::domain::{EventCategory, Severity, StreamEvent};
use crate::store::models::{AlertRow, EquipmentRow, MetricRow, QualityRow};

/// Derives alert severity from the overshoot ratio `value / threshold`.
#[must_use]
pub fn alert_severity(value: f64, threshold: f64) -> Severity {
    if threshold <= 0.0 {
        return Severity::Warning;
    }
    let ratio = value / threshold;
    if ratio >= 2.0 {
        Severity::Critical
    } else if ratio >= 1.5 {
        Severity::Error
    } else if ratio >= 1.0 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Derives equipment-event severity from the new status.
#[must_use]
pub fn status_severity(status: &str) -> Severity {
    match status {
        "down" => Severity::Error,
        "maintenance" => Severity::Warning,
        _ => Severity::Info,
    }
}

/// A quality reading is within spec when the deviation from target does
/// not exceed the tolerance.
#[must_use]
pub fn within_spec(actual: f64, target: f64, tolerance: f64) -> bool {
    (actual - target).abs() <= tolerance
}

/// Maps a metric row to a `metric` event.
#[must_use]
pub fn metric_event(row: &MetricRow) -> StreamEvent {
    StreamEvent::new(
        EventCategory::Metric,
        row.recorded_at,
        json!({
            "equipmentId": row.equipment_id,
            "lineId": row.line_id,
            "name": row.name,
            "value": row.value,
            "unit": row.unit,
        }),
    )
    .with_source(row.equipment_id.clone())
}

/// Maps an alert row to an `alert` event with derived severity.
#[must_use]
pub fn alert_event(row: &AlertRow) -> StreamEvent {
    StreamEvent::new(
        EventCategory::Alert,
        row.created_at,
        json!({
            "alertId": row.id,
            "equipmentId": row.equipment_id,
            "alertType": row.alert_type,
            "message": row.message,
            "value": row.value,
            "threshold": row.threshold,
            "acknowledged": row.acknowledged,
        }),
    )
    .with_source(row.equipment_id.clone())
    .with_severity(alert_severity(row.value, row.threshold))
}

/// Maps a quality check row to a `quality` event with derived
/// within-spec flag and severity.
#[must_use]
pub fn quality_event(row: &QualityRow) -> StreamEvent {
    let in_spec = within_spec(row.actual, row.target, row.tolerance);
    let severity = if in_spec {
        Severity::Info
    } else {
        Severity::Warning
    };
    StreamEvent::new(
        EventCategory::Quality,
        row.recorded_at,
        json!({
            "equipmentId": row.equipment_id,
            "parameter": row.parameter,
            "actual": row.actual,
            "target": row.target,
            "tolerance": row.tolerance,
            "withinSpec": in_spec,
        }),
    )
    .with_source(row.equipment_id.clone())
    .with_severity(severity)
}

/// Maps an equipment row to an `equipment` event with status-derived
/// severity.
#[must_use]
pub fn equipment_event(row: &EquipmentRow) -> StreamEvent {
    StreamEvent::new(
        EventCategory::Equipment,
        row.updated_at,
        json!({
            "equipmentId": row.id,
            "name": row.name,
            "status": row.status,
            "oee": row.oee(),
        }),
    )
    .with_source(row.name.clone())
    .with_severity(status_severity(&row.status))
}
