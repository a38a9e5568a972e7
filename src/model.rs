//! Wire-level data models shared by the push and pull channels.
//!
//! Both delivery paths produce the same [`Notification`] record; identity
//! is the `id` field, and two records with the same id are the same event
//! regardless of which channel carried them. [`PresenceStatus`] is a single
//! current value, overwritten wholesale on each update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification record as delivered by the backend.
///
/// `id` is unique and stable across channels. The `notification_type`
/// string is free-form on the wire; severity classification happens in
/// [`crate::escalation`], never here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Unique, channel-stable identifier.
    pub id: String,

    /// Free-form classification string (e.g. `"booking_rejected"`).
    #[serde(rename = "type")]
    pub notification_type: String,

    /// Short headline.
    pub title: String,

    /// Body text.
    pub message: String,

    /// Opaque payload forwarded to UI consumers untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Read state. Sticky: once true, a re-delivery never flips it back.
    #[serde(default)]
    pub read: bool,
}

/// A user visible in the presence roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OnlineUser {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role label (e.g. `"planning_engineer"`).
    pub role_name: String,
}

/// Current "privileged operator online" status.
///
/// No history is retained; each update replaces the previous value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PresenceStatus {
    /// Whether at least one privileged operator is online.
    pub online: bool,
    /// Human-readable summary for the sidebar indicator.
    #[serde(default)]
    pub message: String,
    /// Ordered roster of currently-online privileged users.
    #[serde(default)]
    pub online_users: Vec<OnlineUser>,
}
