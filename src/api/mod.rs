//! HTTP surface: system endpoints and router composition.
//!
//! The gateway's HTTP surface is intentionally small; everything of
//! substance happens over WebSocket.

pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Builds the HTTP router.
pub fn build_router() -> Router<AppState> {
    system::routes()
}
