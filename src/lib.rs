//! Console Notify - Real-time notification and presence core.
//!
//! This crate provides the client-side delivery subsystem for the
//! management console: a persistent push channel with automatic
//! reconnection, a REST fallback poller, a deduplicating notification
//! store, severity-based alert escalation, and privileged-operator
//! presence tracking.
//!
//! # Architecture
//!
//! One [`NotificationCenter`] per signed-in session owns the shared
//! state and background tasks:
//!
//! - **Connection** - Persistent WebSocket push channel with fixed-delay reconnect
//! - **Poller** - REST fallback, a no-op while the push channel is live
//! - **Store** - Canonical deduplicated notification list and unread count
//! - **Dispatch** - Escalation boundary feeding toast/floating/modal surfaces
//! - **Presence** - Current operator-online status with multi-subscriber pub/sub
//!
//! # Modules
//!
//! - [`session`] - Per-session orchestration and lifecycle
//! - [`connection`] - Push-channel state machine and frame dispatch
//! - [`store`] - Notification records and unread reconciliation
//! - [`escalation`] - Severity classification and alert policy
//! - [`presence`] - Presence tracking and subscriptions

pub mod api;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod escalation;
pub mod floating;
pub mod model;
pub mod poller;
pub mod presence;
pub mod protocol;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionState;
pub use dispatch::{AlertEvent, DeliveryPath};
pub use error::NotifyError;
pub use escalation::Tier;
pub use model::{Notification, OnlineUser, PresenceStatus};
pub use presence::PresenceSubscription;

// Re-export the session entry point
pub use session::NotificationCenter;
