//! Tagged-record wire protocol for the push channel.
//!
//! All frames in both directions are JSON records with an `event`
//! discriminator and an optional `data` payload:
//!
//! ```text
//! {"event": "notification",    "data": { ...Notification }}
//! {"event": "presence_change", "data": { ...PresenceStatus }}
//! {"event": "pong"}
//! {"event": "ping"}                                (client → server)
//! ```
//!
//! The liveness probe uses the same tagged format as everything else,
//! so a reader only ever needs one parser. Frames that fail to parse
//! are dropped by the connection manager, never fatal.

use serde::{Deserialize, Serialize};

use crate::model::{Notification, PresenceStatus};

/// A frame received from the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A notification record to reconcile into the store.
    Notification(Notification),
    /// A wholesale presence update.
    PresenceChange(PresenceStatus),
    /// Acknowledgment of a client liveness probe.
    Pong,
}

/// A frame sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Liveness probe, sent on a fixed interval while connected.
    Ping,
}

impl ServerEvent {
    /// Parse a text frame. `None` means the frame is not a tagged record
    /// (or carries an unknown tag) and should be dropped.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

impl ClientEvent {
    /// Serialize to the wire format.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"event\":\"ping\"}"))
    }
}
