//! Domain layer: events, channels, and the publish/subscribe bus.
//!
//! This module contains the gateway's domain model: the immutable event
//! envelope, the event bus that dispatches events to subscribers, the
//! fixed channel set, and type-safe connection identity.

pub mod channel;
pub mod connection_id;
pub mod event;
pub mod event_bus;

pub use channel::Channel;
pub use connection_id::ConnectionId;
pub use event::Event;
pub use event_bus::{EventBus, EventHandler, WILDCARD};
