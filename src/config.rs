//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with sensible defaults for local
//! development.

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// HS256 secret used to verify access tokens on WebSocket connect.
    pub jwt_secret: String,

    /// Seconds between heartbeat cycles.
    pub heartbeat_interval_secs: u64,

    /// Seconds a connection may go without a pong before eviction.
    pub heartbeat_timeout_secs: u64,

    /// Capacity of each connection's outbound frame queue. A connection
    /// whose queue fills up is treated as failed and unregistered.
    pub outbound_queue_capacity: usize,

    /// Seconds to wait for a first-message auth frame before closing.
    pub auth_timeout_secs: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let jwt_secret =
            std::env::var("WS_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());

        let heartbeat_interval_secs = parse_env("HEARTBEAT_INTERVAL_SECS", 15);
        let heartbeat_timeout_secs = parse_env("HEARTBEAT_TIMEOUT_SECS", 30);
        let outbound_queue_capacity = parse_env("WS_OUTBOUND_QUEUE", 32);
        let auth_timeout_secs = parse_env("WS_AUTH_TIMEOUT_SECS", 5);

        Ok(Self {
            listen_addr,
            jwt_secret,
            heartbeat_interval_secs,
            heartbeat_timeout_secs,
            outbound_queue_capacity,
            auth_timeout_secs,
        })
    }

    /// Interval between heartbeat cycles as a [`Duration`].
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Pong timeout as a [`Duration`].
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// First-message auth timeout as a [`Duration`].
    #[must_use]
    pub const fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
