//! SSE streaming endpoint.
//!
//! One response stream maps to exactly one subscription. The first
//! frame is a `connected` event carrying the subscription id; every
//! delivered event is framed with its id and category. Dropping the
//! stream (client disconnect) unsubscribes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::app_state::AppState;
use crate::domain::{EventCategory, Severity, SubscriptionFilters, SubscriptionId};
use crate::error::StreamError;
use crate::stream::StreamService;

/// Query parameters for the SSE endpoint. List-valued filters arrive
/// comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct SseParams {
    /// Comma-separated event categories.
    pub types: Option<String>,
    /// Comma-separated equipment ids.
    pub equipment: Option<String>,
    /// Comma-separated severities.
    pub severity: Option<String>,
    /// Opaque user identifier.
    pub user_id: Option<String>,
}

/// Unsubscribes when the SSE response stream is dropped.
#[derive(Debug)]
struct SubscriptionGuard {
    stream: Arc<StreamService>,
    id: SubscriptionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let stream = Arc::clone(&self.stream);
        let id = self.id;
        tokio::spawn(async move {
            stream.unsubscribe(id).await;
        });
    }
}

/// `GET /api/v1/stream/sse` — Subscribe and stream events over SSE.
///
/// # Errors
///
/// Returns [`StreamError::Protocol`] when a filter parameter cannot be
/// parsed.
#[utoipa::path(
    get,
    path = "/api/v1/stream/sse",
    tag = "Stream",
    summary = "Server-sent event stream",
    description = "Opens an SSE stream delivering manufacturing events matching the query filters. The initial `connected` frame carries the subscription id.",
    params(
        ("types" = Option<String>, Query, description = "Comma-separated event categories"),
        ("equipment" = Option<String>, Query, description = "Comma-separated equipment ids"),
        ("severity" = Option<String>, Query, description = "Comma-separated severities"),
    ),
    responses(
        (status = 200, description = "SSE stream of matching events"),
        (status = 400, description = "Invalid filter parameter"),
    )
)]
pub async fn sse_handler(
    State(state): State<AppState>,
    Query(params): Query<SseParams>,
) -> Result<impl IntoResponse, StreamError> {
    let filters = parse_filters(&params)?;
    let (sub_id, mut receiver) = state.stream.subscribe(filters, params.user_id.clone()).await;
    tracing::info!(subscription = %sub_id, "sse stream opened");

    let guard = SubscriptionGuard {
        stream: Arc::clone(&state.stream),
        id: sub_id,
    };
    let telemetry = Arc::clone(&state.telemetry);

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<Event, Infallible>(
            Event::default()
                .event("connected")
                .data(json!({ "subscriptionId": sub_id.to_string() }).to_string()),
        );
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    telemetry.message_sent();
                    yield Ok(Event::default()
                        .id(event.id.clone())
                        .event(event.category.as_str())
                        .data(payload));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    telemetry.delivery_dropped();
                    tracing::warn!(lagged = n, "sse client lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Parses comma-separated filter parameters into subscription filters.
fn parse_filters(params: &SseParams) -> Result<SubscriptionFilters, StreamError> {
    let types = params
        .types
        .as_deref()
        .map(|list| parse_list::<EventCategory>(list, "types"))
        .transpose()?;
    let severity = params
        .severity
        .as_deref()
        .map(|list| parse_list::<Severity>(list, "severity"))
        .transpose()?;
    let equipment = params.equipment.as_deref().map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    });

    Ok(SubscriptionFilters {
        types,
        equipment,
        severity,
        time_range: None,
    })
}

fn parse_list<T: serde::de::DeserializeOwned>(
    list: &str,
    name: &str,
) -> Result<Vec<T>, StreamError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_value(serde_json::Value::String(s.to_string()))
                .map_err(|_| StreamError::Protocol(format!("invalid {name} value: {s}")))
        })
        .collect()
}
