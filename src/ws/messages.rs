//! WebSocket wire framing: outbound frames and inbound client messages.
//!
//! Every outbound message is a structured object with a `type`
//! discriminator. `"ping"` and `"pong"` are reserved control types;
//! domain frames mirror the originating [`Event`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Event;

/// Discriminator of the liveness ping control frame.
const PING_TYPE: &str = "ping";

/// Server → client frame.
///
/// Control pings serialize as exactly `{"type":"ping"}`. Domain frames
/// carry the event payload and timestamp:
/// `{"type": <event type>, "data": ..., "timestamp": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl Frame {
    /// Builds the liveness ping control frame.
    #[must_use]
    pub fn ping() -> Self {
        Self {
            kind: PING_TYPE.to_string(),
            data: None,
            timestamp: None,
        }
    }

    /// Builds a domain frame mirroring `event`.
    #[must_use]
    pub fn event(event: &Event) -> Self {
        Self {
            kind: event.event_type().to_string(),
            data: Some(event.data().clone()),
            timestamp: Some(event.timestamp()),
        }
    }

    /// Returns the frame's `type` discriminator.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the domain payload, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Returns `true` for the liveness ping control frame.
    #[must_use]
    pub fn is_ping(&self) -> bool {
        self.kind == PING_TYPE
    }
}

/// Client → server message.
///
/// Anything other than the known types is parsed as [`ClientMessage::Unknown`]
/// and ignored by the read loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First-message authentication carrying the access token.
    Auth {
        /// The presented credential.
        token: String,
    },
    /// Liveness response to a server ping. Never forwarded to the bus.
    Pong,
    /// Any other message type.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_serializes_bare() {
        let json = serde_json::to_string(&Frame::ping()).unwrap_or_default();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn event_frame_mirrors_envelope() {
        let event = Event::new("order_status_changed", json!({"user_id": "u1"}));
        let frame = Frame::event(&event);
        assert_eq!(frame.kind(), "order_status_changed");

        let json = serde_json::to_value(&frame).unwrap_or_default();
        assert_eq!(json["type"], "order_status_changed");
        assert_eq!(json["data"]["user_id"], "u1");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn parses_pong() {
        let msg = serde_json::from_str::<ClientMessage>(r#"{"type":"pong"}"#);
        let Ok(msg) = msg else {
            panic!("pong failed to parse");
        };
        assert_eq!(msg, ClientMessage::Pong);
    }

    #[test]
    fn parses_auth_with_token() {
        let msg = serde_json::from_str::<ClientMessage>(r#"{"type":"auth","token":"abc"}"#);
        let Ok(msg) = msg else {
            panic!("auth failed to parse");
        };
        assert_eq!(
            msg,
            ClientMessage::Auth {
                token: "abc".to_string()
            }
        );
    }

    #[test]
    fn unknown_types_fall_through() {
        let msg = serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#);
        let Ok(msg) = msg else {
            panic!("unknown type failed to parse");
        };
        assert_eq!(msg, ClientMessage::Unknown);
    }
}
