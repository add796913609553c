//! Connection registry with addressed broadcast and heartbeat liveness.
//!
//! [`ConnectionManager`] owns the mapping
//! `channel -> target_id -> connections` and is the only code that
//! structurally mutates it. Broadcast delivery and the heartbeat cycle
//! snapshot connection lists under a read guard and release it before
//! enqueueing any frame, so registry mutation never waits on a socket.
//!
//! The heartbeat cycle is the sole mechanism that reclaims connections
//! whose transport died without a clean close: every interval each
//! connection either answers pings (and stays) or exceeds the pong
//! timeout (and is force-closed and unregistered).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::connection::Connection;
use super::messages::Frame;
use crate::domain::Channel;
use crate::error::{GatewayError, close_code};

/// Close reason attached to heartbeat evictions.
const STALE_REASON: &str = "heartbeat timeout";

type Registry = HashMap<Channel, HashMap<String, Vec<Arc<Connection>>>>;

/// Registry of live connections grouped by channel and target id.
///
/// # Concurrency
///
/// - Structural mutation (insert/remove) is serialized under one write
///   lock and never held across an `.await` on a transport.
/// - Delivery enqueues frames through each connection's non-blocking
///   queue; a slow client fails its own queue and is evicted without
///   affecting siblings.
#[derive(Debug)]
pub struct ConnectionManager {
    connections: RwLock<Registry>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Creates an empty registry with the given heartbeat cadence.
    #[must_use]
    pub fn new(heartbeat_interval: Duration, heartbeat_timeout: Duration) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            heartbeat_interval,
            heartbeat_timeout,
            heartbeat_task: Mutex::new(None),
        }
    }

    /// Inserts `conn` into its `(channel, target_id)` bucket and starts
    /// its liveness window.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyRegistered`] if this connection
    /// instance is already in the registry. A closed connection is never
    /// re-registered; a reconnect creates a new instance.
    pub async fn register(&self, conn: Arc<Connection>) -> Result<(), GatewayError> {
        {
            let mut map = self.connections.write().await;
            let bucket = map
                .entry(conn.channel())
                .or_default()
                .entry(conn.target_id().to_string())
                .or_default();
            if bucket.iter().any(|c| c.id() == conn.id()) {
                return Err(GatewayError::AlreadyRegistered(conn.id()));
            }
            bucket.push(Arc::clone(&conn));
        }
        conn.touch().await;

        tracing::info!(
            id = %conn.id(),
            channel = %conn.channel(),
            target = conn.target_id(),
            user = conn.user_id(),
            "ws connected"
        );
        Ok(())
    }

    /// Removes `conn` from its bucket, pruning the target entry if it
    /// empties. Safe to call on an already-removed connection.
    pub async fn unregister(&self, conn: &Connection) {
        let removed = {
            let mut map = self.connections.write().await;
            let Some(targets) = map.get_mut(&conn.channel()) else {
                return;
            };
            let Some(bucket) = targets.get_mut(conn.target_id()) else {
                return;
            };
            let before = bucket.len();
            bucket.retain(|c| c.id() != conn.id());
            let removed = bucket.len() < before;
            if bucket.is_empty() {
                targets.remove(conn.target_id());
            }
            removed
        };

        if removed {
            tracing::info!(
                id = %conn.id(),
                channel = %conn.channel(),
                target = conn.target_id(),
                user = conn.user_id(),
                "ws disconnected"
            );
        }
    }

    /// Sends `frame` to every connection registered under
    /// `(channel, target_id)`. Returns the number of successful sends.
    ///
    /// Sends are independent: a connection whose enqueue fails is
    /// unregistered without aborting delivery to its peers. A target with
    /// no connections is a silent no-op.
    pub async fn broadcast(&self, channel: Channel, target_id: &str, frame: &Frame) -> usize {
        let conns: Vec<Arc<Connection>> = {
            let map = self.connections.read().await;
            map.get(&channel)
                .and_then(|targets| targets.get(target_id))
                .cloned()
                .unwrap_or_default()
        };
        self.deliver(&conns, frame).await
    }

    /// Sends `frame` to every connection in `channel`, across all
    /// targets. Returns the number of successful sends.
    pub async fn broadcast_all(&self, channel: Channel, frame: &Frame) -> usize {
        let conns: Vec<Arc<Connection>> = {
            let map = self.connections.read().await;
            map.get(&channel)
                .map(|targets| targets.values().flatten().cloned().collect())
                .unwrap_or_default()
        };
        self.deliver(&conns, frame).await
    }

    /// Enqueues `frame` on each connection, evicting the ones that fail.
    async fn deliver(&self, conns: &[Arc<Connection>], frame: &Frame) -> usize {
        let mut sent = 0;
        let mut dead = Vec::new();
        for conn in conns {
            match conn.send(frame.clone()) {
                Ok(()) => sent += 1,
                Err(err) => {
                    tracing::warn!(id = %conn.id(), error = %err, "dropping connection");
                    dead.push(Arc::clone(conn));
                }
            }
        }
        for conn in dead {
            self.unregister(&conn).await;
        }
        sent
    }

    /// Total number of connections currently tracked across every channel
    /// and target.
    pub async fn connection_count(&self) -> usize {
        let map = self.connections.read().await;
        map.values().flat_map(HashMap::values).map(Vec::len).sum()
    }

    /// Records a liveness response for `conn`. Pongs never reach the
    /// event bus.
    pub async fn pong_received(&self, conn: &Connection) {
        conn.touch().await;
        tracing::trace!(id = %conn.id(), "pong received");
    }

    /// Runs one heartbeat cycle as seen from `now`.
    ///
    /// Connections idle past the pong timeout are force-closed (code
    /// 4008, reason `heartbeat timeout`) and unregistered; the rest are
    /// sent a `{"type":"ping"}` control frame. A failed ping send evicts
    /// the connection like any other send failure.
    pub async fn heartbeat_pass(&self, now: Instant) {
        let conns: Vec<Arc<Connection>> = {
            let map = self.connections.read().await;
            map.values()
                .flat_map(HashMap::values)
                .flatten()
                .cloned()
                .collect()
        };

        let mut dead = Vec::new();
        for conn in conns {
            let idle = conn.idle_for(now).await;
            if idle > self.heartbeat_timeout {
                tracing::warn!(
                    id = %conn.id(),
                    channel = %conn.channel(),
                    idle_secs = idle.as_secs(),
                    "evicting stale connection"
                );
                conn.close(close_code::STALE, STALE_REASON);
                dead.push(conn);
            } else if let Err(err) = conn.send(Frame::ping()) {
                tracing::warn!(id = %conn.id(), error = %err, "ping failed");
                dead.push(conn);
            }
        }
        for conn in dead {
            self.unregister(&conn).await;
        }
    }

    /// Starts the long-lived heartbeat task. Idempotent: a second call
    /// while the task is running is a no-op, so pings and evictions can
    /// never be doubled.
    pub async fn start_heartbeat(self: Arc<Self>) {
        let mut guard = self.heartbeat_task.lock().await;
        if guard.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let manager = Arc::clone(&self);
        *guard = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.heartbeat_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the cycle proper
            // starts one interval in.
            interval.tick().await;
            loop {
                interval.tick().await;
                manager.heartbeat_pass(Instant::now()).await;
            }
        }));
        tracing::debug!(
            interval_secs = self.heartbeat_interval.as_secs(),
            timeout_secs = self.heartbeat_timeout.as_secs(),
            "heartbeat started"
        );
    }

    /// Stops the heartbeat task if it is running.
    pub async fn stop_heartbeat(&self) {
        if let Some(task) = self.heartbeat_task.lock().await.take() {
            task.abort();
        }
    }
}
