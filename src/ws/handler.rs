//! Axum WebSocket upgrade handlers and the per-connection loops.
//!
//! One route per channel, with the target id in the path. A connection is
//! registered only after the access token validates (query parameter or
//! first-message auth) and the identity is allowed to watch the target;
//! anything else closes the socket before it ever reaches the registry.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::connection::{Connection, Outbound};
use super::messages::ClientMessage;
use crate::app_state::AppState;
use crate::auth::AuthContext;
use crate::domain::Channel;
use crate::error::GatewayError;

/// Query parameters accepted on WebSocket upgrade.
#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// WebSocket routes, one per channel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ws/printer/{printer_id}", get(ws_printer))
        .route("/ws/orders/{user_id}", get(ws_orders))
        .route("/ws/notifications/{user_id}", get(ws_notifications))
}

/// `GET /ws/printer/{printer_id}` — device telemetry stream.
async fn ws_printer(
    ws: WebSocketUpgrade,
    Path(printer_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        run_connection(socket, state, Channel::Printer, printer_id, query.token)
    })
}

/// `GET /ws/orders/{user_id}` — order lifecycle stream.
async fn ws_orders(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state, Channel::Orders, user_id, query.token))
}

/// `GET /ws/notifications/{user_id}` — user notification stream.
async fn ws_notifications(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        run_connection(socket, state, Channel::Notifications, user_id, query.token)
    })
}

/// Runs one connection from upgrade to unregistration.
async fn run_connection(
    socket: WebSocket,
    state: AppState,
    channel: Channel,
    target_id: String,
    query_token: Option<String>,
) {
    let (ws_tx, mut ws_rx) = socket.split();

    let ctx = match authenticate(&state, &mut ws_rx, query_token).await {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::info!(%channel, target = %target_id, error = %err, "ws refused");
            refuse(ws_tx, &err).await;
            return;
        }
    };

    if !target_allowed(channel, &target_id, &ctx) {
        tracing::info!(%channel, target = %target_id, user = %ctx.user_id, "ws forbidden");
        refuse(
            ws_tx,
            &GatewayError::Forbidden(format!("{} may not watch {target_id}", ctx.user_id)),
        )
        .await;
        return;
    }

    let (out_tx, out_rx) = mpsc::channel(state.config.outbound_queue_capacity);
    let conn = Arc::new(Connection::new(channel, target_id, ctx.user_id, out_tx));
    let writer = tokio::spawn(write_loop(ws_tx, out_rx));

    if let Err(err) = state.connections.register(Arc::clone(&conn)).await {
        tracing::error!(id = %conn.id(), error = %err, "registration failed");
        writer.abort();
        return;
    }

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Pong) => state.connections.pong_received(&conn).await,
                // Repeated auth and unknown message types are ignored.
                Ok(_) | Err(_) => {}
            },
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    state.connections.unregister(&conn).await;
    writer.abort();
}

/// Resolves the access token (query or first message) and validates it.
async fn authenticate(
    state: &AppState,
    ws_rx: &mut SplitStream<WebSocket>,
    query_token: Option<String>,
) -> Result<AuthContext, GatewayError> {
    let token = match query_token {
        Some(token) => token,
        None => first_message_token(ws_rx, state).await?,
    };
    state.authorizer.authorize(&token).await
}

/// Waits for a `{"type":"auth","token":...}` frame, bounded by the
/// configured auth timeout.
async fn first_message_token(
    ws_rx: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Result<String, GatewayError> {
    let msg = tokio::time::timeout(state.config.auth_timeout(), ws_rx.next())
        .await
        .map_err(|_| GatewayError::AuthRejected("auth timeout".to_string()))?;

    match msg {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Auth { token }) if !token.is_empty() => Ok(token),
            Ok(ClientMessage::Auth { .. }) => {
                Err(GatewayError::AuthRejected("missing token".to_string()))
            }
            _ => Err(GatewayError::AuthRejected(
                "invalid auth payload".to_string(),
            )),
        },
        _ => Err(GatewayError::AuthRejected(
            "invalid auth payload".to_string(),
        )),
    }
}

/// Per-channel target policy: who may watch which target.
fn target_allowed(channel: Channel, target_id: &str, ctx: &AuthContext) -> bool {
    match channel {
        // Printer feeds are scoped to the owning user's identity.
        Channel::Printer | Channel::Notifications => ctx.user_id == target_id,
        Channel::Orders => ctx.user_id == target_id || ctx.is_admin(),
    }
}

/// Closes an unauthorized socket with the error's close code.
async fn refuse(mut ws_tx: SplitSink<WebSocket, Message>, err: &GatewayError) {
    let frame = CloseFrame {
        code: err.close_code(),
        reason: err.to_string().into(),
    };
    let _ = ws_tx.send(Message::Close(Some(frame))).await;
}

/// Drains the outbound queue into the socket sink until the queue closes,
/// the sink errors, or a close command arrives.
async fn write_loop(mut ws_tx: SplitSink<WebSocket, Message>, mut out_rx: mpsc::Receiver<Outbound>) {
    while let Some(cmd) = out_rx.recv().await {
        match cmd {
            Outbound::Frame(frame) => {
                let json = serde_json::to_string(&frame).unwrap_or_default();
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let _ = ws_tx
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })))
                    .await;
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn ctx(user_id: &str, role: Option<&str>) -> AuthContext {
        AuthContext {
            user_id: user_id.to_string(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn owner_may_watch_own_targets() {
        let owner = ctx("u1", None);
        assert!(target_allowed(Channel::Printer, "u1", &owner));
        assert!(target_allowed(Channel::Orders, "u1", &owner));
        assert!(target_allowed(Channel::Notifications, "u1", &owner));
    }

    #[test]
    fn admin_may_watch_any_order_feed() {
        let admin = ctx("ops", Some("admin"));
        assert!(target_allowed(Channel::Orders, "u1", &admin));
        assert!(!target_allowed(Channel::Notifications, "u1", &admin));
        assert!(!target_allowed(Channel::Printer, "u1", &admin));
    }

    #[test]
    fn stranger_is_refused_everywhere() {
        let stranger = ctx("u2", Some("maker"));
        assert!(!target_allowed(Channel::Printer, "u1", &stranger));
        assert!(!target_allowed(Channel::Orders, "u1", &stranger));
        assert!(!target_allowed(Channel::Notifications, "u1", &stranger));
    }
}
