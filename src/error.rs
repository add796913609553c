//! Gateway error types with WebSocket close-code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Failures in
//! this subsystem are scoped to a single connection or a single handler
//! invocation; none is process-fatal. Variants that terminate a WebSocket
//! map to an application close code.

use crate::domain::ConnectionId;

/// Application WebSocket close codes (4000-4999 range).
pub mod close_code {
    /// Credential missing, malformed, expired, or invalid.
    pub const AUTH_FAILED: u16 = 4001;
    /// Authenticated identity is not allowed to watch the target.
    pub const FORBIDDEN: u16 = 4003;
    /// Connection exceeded the heartbeat timeout without a pong.
    pub const STALE: u16 = 4008;
}

/// Server-side error enum.
///
/// # Close Codes
///
/// | Variant             | Scope                        | Close code |
/// |---------------------|------------------------------|------------|
/// | `AuthRejected`      | connection, pre-registration | 4001       |
/// | `Forbidden`         | connection, pre-registration | 4003       |
/// | `HeartbeatTimeout`  | one registered connection    | 4008       |
/// | `SendFailed`        | one registered connection    | eviction   |
/// | `AlreadyRegistered` | caller bug                   | —          |
/// | `UnknownChannel`    | caller bug                   | —          |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The presented credential failed validation; the connection never
    /// reaches the registry.
    #[error("authorization rejected: {0}")]
    AuthRejected(String),

    /// The authenticated identity may not bind to the requested target.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Writing a frame to one specific connection failed; that connection
    /// alone is unregistered.
    #[error("send failed on connection {id}: {reason}")]
    SendFailed {
        /// The connection whose transport failed.
        id: ConnectionId,
        /// What the transport reported.
        reason: String,
    },

    /// The connection went idle past the heartbeat timeout and was
    /// force-closed.
    #[error("connection {0} timed out waiting for pong")]
    HeartbeatTimeout(ConnectionId),

    /// The same connection instance was registered twice.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The channel name is not part of the fixed channel set.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

impl GatewayError {
    /// Returns the WebSocket close code for variants that terminate a
    /// connection before or during registration.
    #[must_use]
    pub const fn close_code(&self) -> u16 {
        match self {
            Self::AuthRejected(_) => close_code::AUTH_FAILED,
            Self::Forbidden(_) => close_code::FORBIDDEN,
            Self::HeartbeatTimeout(_) => close_code::STALE,
            // Internal conditions; never sent to a client directly.
            Self::SendFailed { .. } | Self::AlreadyRegistered(_) | Self::UnknownChannel(_) => 1011,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejected_maps_to_4001() {
        let err = GatewayError::AuthRejected("bad token".to_string());
        assert_eq!(err.close_code(), close_code::AUTH_FAILED);
    }

    #[test]
    fn forbidden_maps_to_4003() {
        let err = GatewayError::Forbidden("not your order feed".to_string());
        assert_eq!(err.close_code(), close_code::FORBIDDEN);
    }

    #[test]
    fn heartbeat_timeout_maps_to_4008() {
        let err = GatewayError::HeartbeatTimeout(ConnectionId::new());
        assert_eq!(err.close_code(), close_code::STALE);
    }

    #[test]
    fn display_includes_connection_id() {
        let id = ConnectionId::new();
        let err = GatewayError::AlreadyRegistered(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
