//! Command/query dispatcher.
//!
//! WebSocket `command` and `query` messages are routed here by string
//! name. Commands mutate the store and require the `write` permission;
//! queries are read-only point-in-time lookups requiring `read`.
//! Unrecognized names are answered with an error naming the operation,
//! never silently ignored.

mod commands;
mod queries;

use std::sync::Arc;

use serde_json::Value;

use crate::error::StreamError;
use crate::store::StreamStore;
use crate::stream::StreamService;
use crate::ws::identity::ClientIdentity;
use crate::ws::registry::ConnectionRegistry;

/// Name-routed executor for WebSocket commands and queries.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<dyn StreamStore>,
    stream: Arc<StreamService>,
    connections: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn StreamStore>,
        stream: Arc<StreamService>,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            store,
            stream,
            connections,
        }
    }

    /// Executes a mutating command on behalf of a connection.
    ///
    /// The payload must carry a `command` name; remaining fields are
    /// command-specific. A successful acknowledgement additionally
    /// broadcasts an `event` frame to every connected client.
    ///
    /// # Errors
    ///
    /// [`StreamError::Permission`] without `write`;
    /// [`StreamError::Protocol`] on a malformed payload;
    /// [`StreamError::UnknownCommand`] for unrecognized names;
    /// [`StreamError::NotFound`] / [`StreamError::Store`] from the
    /// store. On error no state is changed.
    pub async fn execute_command(
        &self,
        identity: &ClientIdentity,
        data: Option<&Value>,
    ) -> Result<Value, StreamError> {
        let data = data.ok_or_else(|| StreamError::Protocol("command payload required".into()))?;
        let name = data
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| StreamError::Protocol("command name required".into()))?;

        if !identity.can_write() {
            return Err(StreamError::Permission(name.to_string()));
        }

        match name {
            "acknowledgeAlert" => self.acknowledge_alert(identity, data).await,
            "updateEquipmentStatus" => self.update_equipment_status(data).await,
            "createAnnotation" => self.create_annotation(identity, data).await,
            other => Err(StreamError::UnknownCommand(other.to_string())),
        }
    }

    /// Executes a read-only query on behalf of a connection.
    ///
    /// # Errors
    ///
    /// [`StreamError::Permission`] without `read`;
    /// [`StreamError::Protocol`] on a malformed payload;
    /// [`StreamError::UnknownQuery`] for unrecognized names;
    /// [`StreamError::Store`] from the store.
    pub async fn execute_query(
        &self,
        identity: &ClientIdentity,
        data: Option<&Value>,
    ) -> Result<Value, StreamError> {
        let data = data.ok_or_else(|| StreamError::Protocol("query payload required".into()))?;
        let name = data
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| StreamError::Protocol("query name required".into()))?;

        if !identity.can_read() {
            return Err(StreamError::Permission(name.to_string()));
        }

        match name {
            "currentOEE" => self.current_oee(data).await,
            "activeAlerts" => self.active_alerts(data).await,
            "equipmentStatus" => self.equipment_status(data).await,
            "productionRate" => self.production_rate(data).await,
            other => Err(StreamError::UnknownQuery(other.to_string())),
        }
    }

    pub(crate) fn store(&self) -> &dyn StreamStore {
        &*self.store
    }

    pub(crate) fn stream(&self) -> &StreamService {
        &self.stream
    }

    pub(crate) fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }
}
