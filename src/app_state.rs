//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::Authorizer;
use crate::config::GatewayConfig;
use crate::domain::EventBus;
use crate::ws::ConnectionManager;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Built once at startup; every producer and the transport-accept path
/// share the same bus and registry instances by reference.
#[derive(Clone)]
pub struct AppState {
    /// Event bus shared by producers and the WebSocket bridges.
    pub event_bus: Arc<EventBus>,
    /// Connection registry and heartbeat owner.
    pub connections: Arc<ConnectionManager>,
    /// Identity collaborator consulted before registration.
    pub authorizer: Arc<dyn Authorizer>,
    /// Gateway settings.
    pub config: GatewayConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("event_bus", &self.event_bus)
            .field("connections", &self.connections)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
