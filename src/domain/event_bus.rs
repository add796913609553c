//! In-process publish/subscribe dispatcher for domain events.
//!
//! [`EventBus`] decouples event producers from consumers. Handlers are
//! registered per event type (or under the [`WILDCARD`] key to observe
//! every event) and invoked in subscription order on every matching
//! [`EventBus::publish`]. Handler failures are logged and isolated: one
//! failing subscriber never affects its siblings or the publisher.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use super::Event;

/// Reserved subscription key matching every event type.
pub const WILDCARD: &str = "*";

/// A subscriber callback: consumes an [`Event`], may fail.
///
/// Handlers are compared by identity ([`Arc::ptr_eq`]) for
/// [`EventBus::unsubscribe`], so a handler must be unsubscribed with the
/// same `Arc` it was subscribed with.
pub type EventHandler = Arc<dyn Fn(Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wraps an async closure into an [`EventHandler`].
pub fn handler<F, Fut>(f: F) -> EventHandler
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// Publish/subscribe dispatcher keyed by event type.
///
/// # Concurrency
///
/// The handler registry lives behind a [`RwLock`]; `publish` clones the
/// matching handler list under a read guard and releases it before any
/// handler runs, so handlers may freely subscribe, unsubscribe, or publish
/// again without deadlocking.
///
/// # Ordering
///
/// Within one `publish` call, handlers run sequentially in subscription
/// order: first the handlers for the event's type, then the wildcard
/// handlers. `publish` returns only after every handler has completed, so
/// a caller that awaits it observes all registered side effects.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event_type` (or [`WILDCARD`]).
    ///
    /// Subscriptions are additive: registering the same handler twice
    /// yields two deliveries per matching publish until it is
    /// unsubscribed the same number of times.
    pub async fn subscribe(&self, event_type: &str, handler: EventHandler) {
        let mut map = self.handlers.write().await;
        map.entry(event_type.to_string()).or_default().push(handler);
    }

    /// Removes one occurrence of `handler` from `event_type`'s list.
    ///
    /// Matching is by identity, not value. A handler that was never
    /// subscribed (or was already fully unsubscribed) is a no-op.
    pub async fn unsubscribe(&self, event_type: &str, handler: &EventHandler) {
        let mut map = self.handlers.write().await;
        if let Some(list) = map.get_mut(event_type) {
            if let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) {
                list.remove(pos);
            }
            if list.is_empty() {
                map.remove(event_type);
            }
        }
    }

    /// Delivers `event` to every matching handler.
    ///
    /// Handlers for `event.event_type()` run first, then wildcard
    /// handlers, each awaited to completion in subscription order. A
    /// handler error is logged and does not stop later handlers or
    /// surface to the caller. Publishing with no subscribers is a no-op.
    pub async fn publish(&self, event: Event) {
        let matching: Vec<EventHandler> = {
            let map = self.handlers.read().await;
            map.get(event.event_type())
                .into_iter()
                .chain(map.get(WILDCARD))
                .flatten()
                .cloned()
                .collect()
        };

        tracing::debug!(
            event_type = %event.event_type(),
            handlers = matching.len(),
            "publishing event"
        );

        for handler in matching {
            if let Err(err) = handler(event.clone()).await {
                tracing::error!(
                    event_type = %event.event_type(),
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }

    /// Returns the number of handlers registered for `event_type`.
    pub async fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    fn make_event(event_type: &str) -> Event {
        Event::new(event_type, json!({"k": "v"}))
    }

    /// Handler that appends `label` to the shared log on every invocation.
    fn recording_handler(log: Arc<Mutex<Vec<String>>>, label: &str) -> EventHandler {
        let label = label.to_string();
        handler(move |_event| {
            let log = Arc::clone(&log);
            let label = label.clone();
            async move {
                log.lock().await.push(label);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = EventBus::new();
        bus.publish(make_event("order_status_changed")).await;
        assert_eq!(bus.handler_count("order_status_changed").await, 0);
    }

    #[tokio::test]
    async fn duplicate_subscription_delivers_twice() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = recording_handler(Arc::clone(&log), "h");

        bus.subscribe("notification", Arc::clone(&h)).await;
        bus.subscribe("notification", Arc::clone(&h)).await;
        bus.publish(make_event("notification")).await;

        assert_eq!(log.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_removes_exactly_one_occurrence() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = recording_handler(Arc::clone(&log), "h");

        bus.subscribe("notification", Arc::clone(&h)).await;
        bus.subscribe("notification", Arc::clone(&h)).await;
        bus.unsubscribe("notification", &h).await;
        assert_eq!(bus.handler_count("notification").await, 1);

        bus.publish(make_event("notification")).await;
        assert_eq!(log.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_unknown_handler_is_a_noop() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let registered = recording_handler(Arc::clone(&log), "a");
        let stranger = recording_handler(Arc::clone(&log), "b");

        bus.subscribe("notification", Arc::clone(&registered)).await;
        bus.unsubscribe("notification", &stranger).await;
        bus.unsubscribe("never_seen", &stranger).await;

        assert_eq!(bus.handler_count("notification").await, 1);
    }

    #[tokio::test]
    async fn wildcard_receives_every_event_type() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(WILDCARD, recording_handler(Arc::clone(&log), "w"))
            .await;

        bus.publish(make_event("printer_status_changed")).await;
        bus.publish(make_event("order_status_changed")).await;
        bus.publish(make_event("anything_else")).await;

        assert_eq!(log.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn typed_handlers_run_before_wildcard_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(WILDCARD, recording_handler(Arc::clone(&log), "wild"))
            .await;
        bus.subscribe("notification", recording_handler(Arc::clone(&log), "first"))
            .await;
        bus.subscribe("notification", recording_handler(Arc::clone(&log), "second"))
            .await;

        bus.publish(make_event("notification")).await;

        let order = log.lock().await.clone();
        assert_eq!(order, vec!["first", "second", "wild"]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_siblings() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "notification",
            handler(|_event| async { Err(anyhow::anyhow!("boom")) }),
        )
        .await;
        bus.subscribe("notification", recording_handler(Arc::clone(&log), "ok"))
            .await;

        bus.publish(make_event("notification")).await;

        assert_eq!(log.lock().await.clone(), vec!["ok"]);
    }

    #[tokio::test]
    async fn publish_returns_after_side_effects_complete() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("notification", recording_handler(Arc::clone(&log), "done"))
            .await;

        bus.publish(make_event("notification")).await;

        // No yield between publish and assert: the effect must be visible.
        assert_eq!(log.lock().await.clone(), vec!["done"]);
    }
}
