//! Mutating command handlers.

use serde_json::{Value, json};

use super::Dispatcher;
use crate::error::StreamError;
use crate::poller::mapping;
use crate::store::models::NewAnnotation;
use crate::ws::identity::ClientIdentity;
use crate::ws::messages::ServerMessage;

impl Dispatcher {
    /// `acknowledgeAlert{alertId}` — marks the alert acknowledged and
    /// notifies every connected client, independent of their filters.
    pub(crate) async fn acknowledge_alert(
        &self,
        identity: &ClientIdentity,
        data: &Value,
    ) -> Result<Value, StreamError> {
        let alert_id = data
            .get("alertId")
            .and_then(Value::as_i64)
            .ok_or_else(|| StreamError::Protocol("alertId required".into()))?;

        let row = self
            .store()
            .acknowledge_alert(alert_id, identity.user_id.as_deref())
            .await?
            .ok_or_else(|| StreamError::NotFound(format!("alert {alert_id}")))?;

        let notified = self
            .connections()
            .broadcast_all(&ServerMessage::event(json!({
                "type": "alert",
                "action": "acknowledged",
                "alertId": row.id,
                "equipmentId": row.equipment_id,
                "acknowledgedBy": identity.user_id,
            })))
            .await;
        tracing::info!(alert_id, notified, "alert acknowledged");

        Ok(json!({ "acknowledged": true, "alertId": alert_id }))
    }

    /// `updateEquipmentStatus{equipmentId, status}` — updates the row
    /// and publishes the change as a filtered `equipment` event.
    pub(crate) async fn update_equipment_status(&self, data: &Value) -> Result<Value, StreamError> {
        let equipment_id = data
            .get("equipmentId")
            .and_then(Value::as_str)
            .ok_or_else(|| StreamError::Protocol("equipmentId required".into()))?;
        let status = data
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| StreamError::Protocol("status required".into()))?;

        let row = self
            .store()
            .update_equipment_status(equipment_id, status)
            .await?
            .ok_or_else(|| StreamError::NotFound(format!("equipment {equipment_id}")))?;

        let _ = self.stream().publish(mapping::equipment_event(&row)).await;
        tracing::info!(equipment_id, status, "equipment status updated");

        Ok(json!({
            "updated": true,
            "equipmentId": row.id,
            "status": row.status,
        }))
    }

    /// `createAnnotation{equipmentId?, lineId?, text, author?}` —
    /// inserts an annotation. The author defaults to the connection's
    /// user id.
    pub(crate) async fn create_annotation(
        &self,
        identity: &ClientIdentity,
        data: &Value,
    ) -> Result<Value, StreamError> {
        let mut annotation: NewAnnotation = serde_json::from_value(data.clone())
            .map_err(|e| StreamError::Protocol(format!("invalid annotation: {e}")))?;
        if annotation.text.trim().is_empty() {
            return Err(StreamError::Protocol("annotation text required".into()));
        }
        if annotation.author.is_none() {
            annotation.author = identity.user_id.clone();
        }

        let id = self.store().create_annotation(&annotation).await?;
        tracing::info!(annotation_id = id, "annotation created");

        Ok(json!({ "created": true, "annotationId": id }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventCategory, SubscriptionFilters};
    use crate::store::StreamStore;
    use crate::store::fake::FakeStore;
    use crate::store::models::{AlertRow, EquipmentRow};
    use crate::stream::{StreamService, StreamSettings};
    use crate::ws::identity::IdentityParams;
    use crate::ws::registry::ConnectionRegistry;
    use chrono::Utc;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<FakeStore>,
        stream: Arc<StreamService>,
        connections: Arc<ConnectionRegistry>,
        dispatcher: Dispatcher,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(FakeStore::new());
        let stream = Arc::new(StreamService::new(StreamSettings::default()));
        let connections = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&store) as Arc<dyn StreamStore>,
            Arc::clone(&stream),
            Arc::clone(&connections),
        );
        Fixture {
            store,
            stream,
            connections,
            dispatcher,
        }
    }

    fn writer() -> ClientIdentity {
        ClientIdentity::from_params(&IdentityParams {
            user_id: Some("op-1".to_string()),
            permissions: Some("read,write".to_string()),
        })
    }

    fn reader() -> ClientIdentity {
        ClientIdentity::from_params(&IdentityParams::default())
    }

    fn pending_alert(id: i64) -> AlertRow {
        AlertRow {
            id,
            equipment_id: "cnc-1".to_string(),
            alert_type: "temperature_high".to_string(),
            message: "temperature above threshold".to_string(),
            value: 120.0,
            threshold: 100.0,
            acknowledged: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn command_without_write_is_denied_and_store_untouched() {
        let fx = fixture();
        if let Ok(mut alerts) = fx.store.alerts.lock() {
            alerts.push(pending_alert(1));
        }

        let result = fx
            .dispatcher
            .execute_command(
                &reader(),
                Some(&json!({"command": "acknowledgeAlert", "alertId": 1})),
            )
            .await;
        assert!(matches!(result, Err(StreamError::Permission(_))));

        let Ok(alerts) = fx.store.alerts.lock() else {
            panic!("lock poisoned");
        };
        assert!(alerts.iter().all(|a| !a.acknowledged));
    }

    #[tokio::test]
    async fn acknowledge_alert_updates_store_and_broadcasts_to_all() {
        let fx = fixture();
        if let Ok(mut alerts) = fx.store.alerts.lock() {
            alerts.push(pending_alert(7));
        }

        // Two connections, neither subscribed to anything.
        let (tx_a, mut rx_a) = tokio::sync::mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = tokio::sync::mpsc::unbounded_channel();
        fx.connections
            .insert(crate::domain::ConnectionId::new(), tx_a, None)
            .await;
        fx.connections
            .insert(crate::domain::ConnectionId::new(), tx_b, None)
            .await;

        let Ok(result) = fx
            .dispatcher
            .execute_command(
                &writer(),
                Some(&json!({"command": "acknowledgeAlert", "alertId": 7})),
            )
            .await
        else {
            panic!("command should succeed");
        };
        assert_eq!(result.pointer("/acknowledged"), Some(&json!(true)));

        let Ok(alerts) = fx.store.alerts.lock() else {
            panic!("lock poisoned");
        };
        assert!(alerts.iter().all(|a| a.acknowledged));
        drop(alerts);

        for rx in [&mut rx_a, &mut rx_b] {
            let Some(frame) = rx.recv().await.map(|m| m.data) else {
                panic!("broadcast missing");
            };
            let Some(data) = frame else {
                panic!("broadcast frame without data");
            };
            assert_eq!(data.pointer("/action"), Some(&json!("acknowledged")));
            assert_eq!(data.pointer("/alertId"), Some(&json!(7)));
        }
    }

    #[tokio::test]
    async fn acknowledge_unknown_alert_is_not_found() {
        let fx = fixture();
        let result = fx
            .dispatcher
            .execute_command(
                &writer(),
                Some(&json!({"command": "acknowledgeAlert", "alertId": 404})),
            )
            .await;
        assert!(matches!(result, Err(StreamError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_equipment_status_publishes_filtered_event() {
        let fx = fixture();
        if let Ok(mut equipment) = fx.store.equipment.lock() {
            equipment.push(EquipmentRow {
                id: "press-2".to_string(),
                name: "Hydraulic Press 2".to_string(),
                status: "running".to_string(),
                availability: 0.95,
                performance: 0.9,
                quality: 0.99,
                updated_at: Utc::now(),
            });
        }
        let filters = SubscriptionFilters {
            types: Some(vec![EventCategory::Equipment]),
            ..Default::default()
        };
        let (_id, mut rx) = fx.stream.subscribe(filters, None).await;

        let Ok(result) = fx
            .dispatcher
            .execute_command(
                &writer(),
                Some(&json!({
                    "command": "updateEquipmentStatus",
                    "equipmentId": "press-2",
                    "status": "maintenance"
                })),
            )
            .await
        else {
            panic!("command should succeed");
        };
        assert_eq!(result.pointer("/status"), Some(&json!("maintenance")));

        let Ok(event) = rx.recv().await else {
            panic!("missing equipment event");
        };
        assert_eq!(event.category, EventCategory::Equipment);
        assert_eq!(event.data.pointer("/status"), Some(&json!("maintenance")));
    }

    #[tokio::test]
    async fn create_annotation_defaults_author_to_user() {
        let fx = fixture();
        let Ok(result) = fx
            .dispatcher
            .execute_command(
                &writer(),
                Some(&json!({
                    "command": "createAnnotation",
                    "equipmentId": "cnc-1",
                    "text": "replaced coolant filter"
                })),
            )
            .await
        else {
            panic!("command should succeed");
        };
        assert_eq!(result.pointer("/created"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn create_annotation_rejects_empty_text() {
        let fx = fixture();
        let result = fx
            .dispatcher
            .execute_command(
                &writer(),
                Some(&json!({"command": "createAnnotation", "text": "  "})),
            )
            .await;
        assert!(matches!(result, Err(StreamError::Protocol(_))));
    }

    #[tokio::test]
    async fn unknown_command_names_operation() {
        let fx = fixture();
        let result = fx
            .dispatcher
            .execute_command(&writer(), Some(&json!({"command": "selfDestruct"})))
            .await;
        let Err(err) = result else {
            panic!("expected error");
        };
        assert_eq!(err.to_string(), "Unknown command: selfDestruct");
    }
}
