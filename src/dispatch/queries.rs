//! Read-only query handlers.

use chrono::{Duration, Utc};
use serde_json::{Value, json};

use super::Dispatcher;
use crate::domain::Severity;
use crate::error::StreamError;
use crate::poller::mapping;

impl Dispatcher {
    /// `currentOEE{equipmentId?}` — OEE components per equipment.
    pub(crate) async fn current_oee(&self, data: &Value) -> Result<Value, StreamError> {
        let equipment_id = data.get("equipmentId").and_then(Value::as_str);
        let rows = self.store().current_oee(equipment_id).await?;

        let readings: Vec<Value> = rows
            .iter()
            .map(|row| {
                json!({
                    "equipmentId": row.id,
                    "name": row.name,
                    "availability": row.availability,
                    "performance": row.performance,
                    "quality": row.quality,
                    "oee": row.oee(),
                })
            })
            .collect();
        Ok(json!({ "readings": readings, "asOf": Utc::now() }))
    }

    /// `activeAlerts{severity?}` — unacknowledged alerts, optionally
    /// restricted to one derived severity.
    pub(crate) async fn active_alerts(&self, data: &Value) -> Result<Value, StreamError> {
        let severity = match data.get("severity") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Severity>(value.clone())
                    .map_err(|_| StreamError::Protocol(format!("invalid severity: {value}")))?,
            ),
        };

        let rows = self.store().active_alerts().await?;
        let alerts: Vec<Value> = rows
            .iter()
            .filter_map(|row| {
                let derived = mapping::alert_severity(row.value, row.threshold);
                if severity.is_some_and(|wanted| wanted != derived) {
                    return None;
                }
                Some(json!({
                    "alertId": row.id,
                    "equipmentId": row.equipment_id,
                    "alertType": row.alert_type,
                    "message": row.message,
                    "value": row.value,
                    "threshold": row.threshold,
                    "severity": derived,
                    "createdAt": row.created_at,
                }))
            })
            .collect();
        Ok(json!({ "alerts": alerts }))
    }

    /// `equipmentStatus{equipmentIds?}` — current status per equipment.
    pub(crate) async fn equipment_status(&self, data: &Value) -> Result<Value, StreamError> {
        let ids: Option<Vec<String>> = match data.get("equipmentIds") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value.clone())
                    .map_err(|_| StreamError::Protocol("equipmentIds must be a string list".into()))?,
            ),
        };

        let rows = self.store().equipment_status(ids.as_deref()).await?;
        let statuses: Vec<Value> = rows
            .iter()
            .map(|row| {
                json!({
                    "equipmentId": row.id,
                    "name": row.name,
                    "status": row.status,
                    "updatedAt": row.updated_at,
                })
            })
            .collect();
        Ok(json!({ "equipment": statuses }))
    }

    /// `productionRate{lineId?, duration?}` — units produced over the
    /// window (`duration` in minutes, default 60) and the hourly rate.
    pub(crate) async fn production_rate(&self, data: &Value) -> Result<Value, StreamError> {
        let line_id = data.get("lineId").and_then(Value::as_str);
        let minutes = data
            .get("duration")
            .and_then(Value::as_u64)
            .unwrap_or(60)
            .max(1);
        let since = Utc::now() - Duration::minutes(i64::try_from(minutes).unwrap_or(60));

        let counts = self.store().production_counts(line_id, since).await?;
        #[allow(clippy::cast_precision_loss)]
        let lines: Vec<Value> = counts
            .iter()
            .map(|count| {
                let rate_per_hour = count.units as f64 * 60.0 / minutes as f64;
                json!({
                    "lineId": count.line_id,
                    "units": count.units,
                    "ratePerHour": rate_per_hour,
                })
            })
            .collect();
        Ok(json!({ "durationMinutes": minutes, "lines": lines }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::StreamStore;
    use crate::store::fake::FakeStore;
    use crate::store::models::{AlertRow, EquipmentRow, ProductionCount};
    use crate::stream::{StreamService, StreamSettings};
    use crate::ws::identity::{ClientIdentity, IdentityParams};
    use crate::ws::registry::ConnectionRegistry;
    use std::sync::Arc;

    fn dispatcher_with(store: Arc<FakeStore>) -> Dispatcher {
        Dispatcher::new(
            store as Arc<dyn StreamStore>,
            Arc::new(StreamService::new(StreamSettings::default())),
            Arc::new(ConnectionRegistry::new()),
        )
    }

    fn reader() -> ClientIdentity {
        ClientIdentity::from_params(&IdentityParams::default())
    }

    fn equipment_row(id: &str) -> EquipmentRow {
        EquipmentRow {
            id: id.to_string(),
            name: format!("Machine {id}"),
            status: "running".to_string(),
            availability: 0.9,
            performance: 0.9,
            quality: 1.0,
            updated_at: Utc::now(),
        }
    }

    fn alert_row(id: i64, value: f64, threshold: f64) -> AlertRow {
        AlertRow {
            id,
            equipment_id: "cnc-1".to_string(),
            alert_type: "temperature_high".to_string(),
            message: "temperature above threshold".to_string(),
            value,
            threshold,
            acknowledged: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn current_oee_reports_components() {
        let store = Arc::new(FakeStore::new());
        if let Ok(mut equipment) = store.equipment.lock() {
            equipment.push(equipment_row("cnc-1"));
        }
        let dispatcher = dispatcher_with(store);

        let Ok(result) = dispatcher
            .execute_query(&reader(), Some(&json!({"query": "currentOEE"})))
            .await
        else {
            panic!("query should succeed");
        };
        let Some(readings) = result.pointer("/readings").and_then(Value::as_array) else {
            panic!("missing readings");
        };
        assert_eq!(readings.len(), 1);
        let oee = readings
            .first()
            .and_then(|r| r.pointer("/oee"))
            .and_then(Value::as_f64);
        let Some(oee) = oee else {
            panic!("missing oee");
        };
        assert!((oee - 0.81).abs() < 1e-9);
    }

    #[tokio::test]
    async fn active_alerts_filters_by_derived_severity() {
        let store = Arc::new(FakeStore::new());
        if let Ok(mut alerts) = store.alerts.lock() {
            alerts.push(alert_row(1, 210.0, 100.0)); // critical
            alerts.push(alert_row(2, 105.0, 100.0)); // warning
        }
        let dispatcher = dispatcher_with(store);

        let Ok(result) = dispatcher
            .execute_query(
                &reader(),
                Some(&json!({"query": "activeAlerts", "severity": "critical"})),
            )
            .await
        else {
            panic!("query should succeed");
        };
        let Some(alerts) = result.pointer("/alerts").and_then(Value::as_array) else {
            panic!("missing alerts");
        };
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts.first().and_then(|a| a.pointer("/alertId")),
            Some(&json!(1))
        );
    }

    #[tokio::test]
    async fn production_rate_computes_hourly_rate() {
        let store = Arc::new(FakeStore::new());
        if let Ok(mut production) = store.production.lock() {
            production.push(ProductionCount {
                line_id: "line-a".to_string(),
                units: 30,
            });
        }
        let dispatcher = dispatcher_with(store);

        let Ok(result) = dispatcher
            .execute_query(
                &reader(),
                Some(&json!({"query": "productionRate", "duration": 30})),
            )
            .await
        else {
            panic!("query should succeed");
        };
        assert_eq!(result.pointer("/durationMinutes"), Some(&json!(30)));
        let rate = result
            .pointer("/lines/0/ratePerHour")
            .and_then(Value::as_f64);
        let Some(rate) = rate else {
            panic!("missing rate");
        };
        assert!((rate - 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_query_names_operation() {
        let dispatcher = dispatcher_with(Arc::new(FakeStore::new()));
        let result = dispatcher
            .execute_query(&reader(), Some(&json!({"query": "unknownQuery"})))
            .await;
        let Err(err) = result else {
            panic!("expected error");
        };
        assert_eq!(err.to_string(), "Unknown query: unknownQuery");
    }

    #[tokio::test]
    async fn invalid_severity_is_protocol_error() {
        let dispatcher = dispatcher_with(Arc::new(FakeStore::new()));
        let result = dispatcher
            .execute_query(
                &reader(),
                Some(&json!({"query": "activeAlerts", "severity": "severe"})),
            )
            .await;
        assert!(matches!(result, Err(StreamError::Protocol(_))));
    }
}
