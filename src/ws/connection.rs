//! Per-connection handle: identity, liveness, and the outbound queue.
//!
//! A [`Connection`] is created only after the authorization boundary has
//! approved the transport, lives in exactly one `(channel, target_id)`
//! bucket of the registry, and is destroyed exactly once — by the client
//! closing, a send failure, or heartbeat eviction.
//!
//! The socket itself is never touched from registry code: each connection
//! owns the sending half of a bounded [`mpsc`] queue, drained into the
//! socket sink by a dedicated writer task. Enqueueing is non-blocking, so
//! a stalled client can only fail its own queue and can never delay
//! registration, sibling broadcasts, or the heartbeat.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use super::messages::Frame;
use crate::domain::{Channel, ConnectionId};
use crate::error::GatewayError;

/// Command consumed by a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialize and send a frame.
    Frame(Frame),
    /// Send a close frame with the given code and reason, then stop.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Human-readable close reason.
        reason: &'static str,
    },
}

/// One live duplex transport bound to a `(channel, target_id)` pair.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    channel: Channel,
    target_id: String,
    user_id: String,
    connected_at: DateTime<Utc>,
    last_pong: Mutex<Instant>,
    outbound: mpsc::Sender<Outbound>,
}

impl Connection {
    /// Creates a connection handle around the writer task's queue.
    #[must_use]
    pub fn new(
        channel: Channel,
        target_id: impl Into<String>,
        user_id: impl Into<String>,
        outbound: mpsc::Sender<Outbound>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            channel,
            target_id: target_id.into(),
            user_id: user_id.into(),
            connected_at: Utc::now(),
            last_pong: Mutex::new(Instant::now()),
            outbound,
        }
    }

    /// Returns the process-unique connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the channel this connection is bound to.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns the target id this connection is addressed to.
    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Returns the authenticated holder of this connection.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns when the connection was accepted.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Enqueues a frame for the writer task.
    ///
    /// Non-blocking: a full queue means the client has stopped draining
    /// and is treated the same as a closed transport.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SendFailed`] if the queue is full or the
    /// writer task is gone.
    pub fn send(&self, frame: Frame) -> Result<(), GatewayError> {
        self.outbound
            .try_send(Outbound::Frame(frame))
            .map_err(|err| {
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => "outbound queue full",
                    mpsc::error::TrySendError::Closed(_) => "transport closed",
                };
                GatewayError::SendFailed {
                    id: self.id,
                    reason: reason.to_string(),
                }
            })
    }

    /// Asks the writer task to close the socket. Best-effort: a writer
    /// that is already gone means the socket is already closed.
    pub fn close(&self, code: u16, reason: &'static str) {
        let _ = self.outbound.try_send(Outbound::Close { code, reason });
    }

    /// Records a liveness response, refreshing `last_pong`.
    pub async fn touch(&self) {
        *self.last_pong.lock().await = Instant::now();
    }

    /// Returns how long the connection has gone without a pong, as seen
    /// from `now`.
    pub async fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_pong.lock().await)
    }
}
