//! Logical channels partitioning the connection registry.
//!
//! Each WebSocket connection binds to exactly one [`Channel`] and one
//! target id within it for its entire lifetime. Adding a topic means
//! adding a variant here and wiring a bridge for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Fixed set of real-time topics served by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Device telemetry, addressed by printer id.
    Printer,
    /// Order lifecycle updates, addressed by user id.
    Orders,
    /// User notifications, addressed by user id.
    Notifications,
}

impl Channel {
    /// Returns the channel name as used on the wire and in routes.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Printer => "printer",
            Self::Orders => "orders",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "printer" => Ok(Self::Printer),
            "orders" => Ok(Self::Orders),
            "notifications" => Ok(Self::Notifications),
            other => Err(GatewayError::UnknownChannel(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for channel in [Channel::Printer, Channel::Orders, Channel::Notifications] {
            let parsed = channel.as_str().parse::<Channel>();
            let Ok(parsed) = parsed else {
                panic!("known channel failed to parse");
            };
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let result = "telemetry".parse::<Channel>();
        assert!(result.is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Channel::Notifications).unwrap_or_default();
        assert_eq!(json, "\"notifications\"");
    }
}
