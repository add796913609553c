//! WebSocket layer: connection handles, the registry, wire framing, and
//! the endpoint loops.
//!
//! The endpoints at `/ws/{channel}/{target_id}` push domain events to
//! clients; the only inbound traffic the gateway acts on is the auth
//! handshake and `{"type":"pong"}` liveness responses.

pub mod bridge;
pub mod connection;
pub mod handler;
pub mod messages;
pub mod registry;

pub use bridge::register_event_bridges;
pub use connection::Connection;
pub use messages::Frame;
pub use registry::ConnectionManager;
