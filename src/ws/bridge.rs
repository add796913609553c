//! Bridges from the event bus to addressed WebSocket broadcasts.
//!
//! One handler is registered per channel. Each one pulls the routing key
//! out of the event payload and forwards the event as a frame to every
//! connection watching that `(channel, target)`; an event without its
//! routing key is skipped.

use std::sync::Arc;

use crate::domain::event::event_types;
use crate::domain::event_bus::{EventHandler, handler};
use crate::domain::{Channel, Event, EventBus};
use crate::ws::messages::Frame;
use crate::ws::registry::ConnectionManager;

/// Subscribes the default event → WebSocket bridges on `bus`.
///
/// Printer telemetry routes by `data.printer_id`; order and notification
/// events route by `data.user_id`.
pub async fn register_event_bridges(bus: &EventBus, manager: Arc<ConnectionManager>) {
    let printer = channel_bridge(Arc::clone(&manager), Channel::Printer, "printer_id");
    bus.subscribe(event_types::PRINTER_STATUS_CHANGED, Arc::clone(&printer))
        .await;
    bus.subscribe(event_types::PRINT_PROGRESS, Arc::clone(&printer))
        .await;
    bus.subscribe(event_types::MODULE_DISCOVERED, printer).await;

    bus.subscribe(
        event_types::ORDER_STATUS_CHANGED,
        channel_bridge(Arc::clone(&manager), Channel::Orders, "user_id"),
    )
    .await;
    bus.subscribe(
        event_types::NOTIFICATION,
        channel_bridge(manager, Channel::Notifications, "user_id"),
    )
    .await;
}

/// Builds a handler that forwards events to `channel`, addressed by the
/// `key` field of the event payload.
fn channel_bridge(
    manager: Arc<ConnectionManager>,
    channel: Channel,
    key: &'static str,
) -> EventHandler {
    handler(move |event: Event| {
        let manager = Arc::clone(&manager);
        async move {
            let target = event
                .data()
                .get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if target.is_empty() {
                tracing::debug!(
                    event_type = %event.event_type(),
                    key,
                    "event missing routing key, skipping"
                );
                return Ok(());
            }
            manager
                .broadcast(channel, target, &Frame::event(&event))
                .await;
            Ok(())
        }
    })
}
