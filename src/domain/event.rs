//! Immutable domain event envelope.
//!
//! Every state change in the platform is announced as an [`Event`]: a
//! `type` discriminator, an arbitrary JSON `data` payload, and a creation
//! timestamp. Producers construct an event once and publish it through the
//! [`super::EventBus`]; the envelope is never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Well-known event type discriminators emitted by platform producers.
///
/// The set is open: producers may publish any type string, and subscribers
/// may register for types not listed here. These constants cover the types
/// the gateway itself routes to WebSocket channels.
pub mod event_types {
    /// A printer changed status (idle, printing, error, offline).
    pub const PRINTER_STATUS_CHANGED: &str = "printer_status_changed";
    /// Progress update for a running print job.
    pub const PRINT_PROGRESS: &str = "print_progress";
    /// A hardware module was discovered on a printer.
    pub const MODULE_DISCOVERED: &str = "module_discovered";
    /// An order moved through its lifecycle.
    pub const ORDER_STATUS_CHANGED: &str = "order_status_changed";
    /// A user-facing notification was generated.
    pub const NOTIFICATION: &str = "notification";
}

/// Immutable event envelope produced by domain collaborators.
///
/// Serializes as `{"type": ..., "data": ..., "timestamp": ...}`. The
/// timestamp is fixed at construction time; fields are only reachable
/// through read-only accessors.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates a new event with the given type and payload, stamped now.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Returns the event type discriminator.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the JSON payload.
    #[must_use]
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_stamps_creation_time() {
        let before = Utc::now();
        let event = Event::new(event_types::NOTIFICATION, json!({}));
        let after = Utc::now();
        assert!(event.timestamp() >= before);
        assert!(event.timestamp() <= after);
    }

    #[test]
    fn serializes_type_field() {
        let event = Event::new(
            event_types::PRINT_PROGRESS,
            json!({"printer_id": "p1", "percent": 42}),
        );
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["type"], "print_progress");
        assert_eq!(json["data"]["percent"], 42);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn accessors_expose_payload() {
        let event = Event::new("custom_type", json!({"k": "v"}));
        assert_eq!(event.event_type(), "custom_type");
        assert_eq!(
            event.data().get("k").and_then(serde_json::Value::as_str),
            Some("v")
        );
    }
}
