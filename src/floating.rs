//! Bounded, auto-expiring queue of floating alert cards.
//!
//! Floating cards are short-lived surfaces for the highest-severity
//! notifications, independent of the persistent store: dismissing or
//! expiring a card never touches the underlying record, and the same
//! record can be re-shown later under a fresh synthetic id.
//!
//! At most `visible_cap` cards render at once
//! ([`crate::constants::FLOATING_VISIBLE_CAP`] by default). Overflow is
//! queued rather than dropped — [`FloatingQueue::visible`] returns the
//! first unexpired entries up to the cap, so a dismissed or expired card
//! frees a slot for the next queued one.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::constants::{FLOATING_TTL, FLOATING_VISIBLE_CAP};
use crate::model::Notification;

/// A notification paired with a synthetic id and an absolute expiry.
#[derive(Debug, Clone)]
pub struct FloatingNotification {
    /// Synthetic id, distinct from the persistent notification id.
    pub floating_id: String,
    /// The underlying record (a copy; the store owns the original).
    pub notification: Notification,
    /// Absolute expiry time.
    expires_at: Instant,
}

impl FloatingNotification {
    /// Whether this card has passed its expiry.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Auto-expiring buffer of floating cards.
pub struct FloatingQueue {
    entries: RwLock<Vec<FloatingNotification>>,
    ttl: Duration,
    visible_cap: usize,
}

impl Default for FloatingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatingQueue {
    /// Create a queue with the standard TTL and visible cap.
    pub fn new() -> Self {
        Self::with_limits(FLOATING_TTL, FLOATING_VISIBLE_CAP)
    }

    /// Create a queue with a custom TTL and the standard cap.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, FLOATING_VISIBLE_CAP)
    }

    /// Create a queue with custom limits.
    pub fn with_limits(ttl: Duration, visible_cap: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            ttl,
            visible_cap,
        }
    }

    /// Accept a notification, assigning a fresh floating id and an expiry
    /// `ttl` from now. Returns the assigned id.
    pub fn push(&self, notification: Notification) -> String {
        let floating_id = Uuid::new_v4().to_string();
        let entry = FloatingNotification {
            floating_id: floating_id.clone(),
            notification,
            expires_at: Instant::now() + self.ttl,
        };

        let mut entries = self.entries.write().expect("floating lock poisoned");
        Self::prune(&mut entries);
        entries.push(entry);
        floating_id
    }

    /// Remove a card immediately. Returns `true` if an unexpired card
    /// with that id was present.
    pub fn dismiss(&self, floating_id: &str) -> bool {
        let mut entries = self.entries.write().expect("floating lock poisoned");
        Self::prune(&mut entries);
        let before = entries.len();
        entries.retain(|e| e.floating_id != floating_id);
        before != entries.len()
    }

    /// The cards currently rendered: the first entries up to the cap,
    /// expired ones pruned first.
    pub fn visible(&self) -> Vec<FloatingNotification> {
        let mut entries = self.entries.write().expect("floating lock poisoned");
        Self::prune(&mut entries);
        entries.iter().take(self.visible_cap).cloned().collect()
    }

    /// Total queued cards including the ones held back by the cap.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.write().expect("floating lock poisoned");
        Self::prune(&mut entries);
        entries.len()
    }

    /// Whether no cards are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything. Used on session teardown.
    pub fn clear(&self) {
        self.entries.write().expect("floating lock poisoned").clear();
    }

    fn prune(entries: &mut Vec<FloatingNotification>) {
        entries.retain(|e| !e.is_expired());
    }
}
