//! # claw-gateway
//!
//! Real-time WebSocket event gateway for the Claw fabrication platform.
//!
//! This crate is the platform's event distribution subsystem: domain
//! collaborators (order lifecycle, device telemetry, notification
//! generation) publish events through an in-process bus, and the gateway
//! fans them out to live WebSocket connections organized by channel and
//! target identity, with heartbeat-driven liveness detection. Delivery is
//! best-effort while a connection is live; there is no replay for clients
//! that reconnect after missing events.
//!
//! ## Architecture
//!
//! ```text
//! Producers (orders, telemetry, notifications)
//!     │
//!     ├── EventBus (domain/)
//!     │       │
//!     │       └── channel bridges (ws/bridge)
//!     │               │
//!     ├── ConnectionManager (ws/registry) ── heartbeat task
//!     │       │
//!     │       └── Connection ── outbound queue ── writer task ── socket
//!     │
//!     ├── WS upgrade routes + auth boundary (ws/handler, auth/)
//!     └── /health (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
