//! claw-gateway server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket endpoints, wires the
//! event bridges, and launches the heartbeat task.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use claw_gateway::api;
use claw_gateway::app_state::AppState;
use claw_gateway::auth::JwtAuthorizer;
use claw_gateway::config::GatewayConfig;
use claw_gateway::domain::EventBus;
use claw_gateway::ws::{self, ConnectionManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting claw-gateway");

    // Build the shared instances: one bus, one registry, one verifier.
    let event_bus = Arc::new(EventBus::new());
    let connections = Arc::new(ConnectionManager::new(
        config.heartbeat_interval(),
        config.heartbeat_timeout(),
    ));
    let authorizer = Arc::new(JwtAuthorizer::new(&config.jwt_secret));

    // Wire domain events to the WebSocket channels and start liveness.
    ws::register_event_bridges(&event_bus, Arc::clone(&connections)).await;
    Arc::clone(&connections).start_heartbeat().await;

    // Build application state
    let app_state = AppState {
        event_bus,
        connections,
        authorizer,
        config: config.clone(),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .merge(ws::handler::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
