//! factory-stream server entry point.
//!
//! Starts the Axum HTTP server with the SSE and WebSocket endpoints,
//! the per-category pollers, and the buffer maintenance task. All
//! background services are started explicitly here and stopped on
//! shutdown.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use factory_stream::api;
use factory_stream::app_state::AppState;
use factory_stream::config::StreamConfig;
use factory_stream::dispatch::Dispatcher;
use factory_stream::poller::{PollerSet, PollerSettings};
use factory_stream::store::StreamStore;
use factory_stream::store::postgres::PostgresStore;
use factory_stream::stream::StreamService;
use factory_stream::telemetry::Telemetry;
use factory_stream::ws::handler::ws_handler;
use factory_stream::ws::registry::ConnectionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = StreamConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting factory-stream");

    // Connect to the manufacturing store
    let store: Arc<dyn StreamStore> = Arc::new(PostgresStore::connect(&config).await?);

    // Build the pub/sub core and its collaborators
    let stream = Arc::new(StreamService::new(config.stream_settings()));
    let connections = Arc::new(ConnectionRegistry::new());
    let telemetry = Arc::new(Telemetry::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&stream),
        Arc::clone(&connections),
    ));
    let pollers = PollerSet::new(
        Arc::clone(&store),
        Arc::clone(&stream),
        Arc::clone(&telemetry),
        PollerSettings::from_config(&config),
    );

    // Start background services
    stream.start();
    pollers.start();

    // Build application state
    let app_state = AppState {
        stream: Arc::clone(&stream),
        dispatcher,
        connections,
        telemetry,
        heartbeat_interval: config.heartbeat_interval(),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Deterministic teardown of background services
    pollers.stop();
    stream.stop();
    tracing::info!("factory-stream stopped");

    Ok(())
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
