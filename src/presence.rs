//! Privileged-operator presence tracking.
//!
//! Holds the single current [`PresenceStatus`] value and broadcasts every
//! update to all registered listeners. Any number of consumers (sidebar
//! dot, dashboards, support panels) may subscribe independently; each
//! subscription returns a handle that unregisters its listener when
//! dropped or explicitly unsubscribed.
//!
//! The tracker itself is transport-agnostic: the push channel feeds it
//! `presence_change` events, and the session's heartbeat task supplements
//! it with direct pulls while the push channel is down.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use crate::model::PresenceStatus;

type Listener = Arc<dyn Fn(&PresenceStatus) + Send + Sync>;

#[derive(Default)]
struct TrackerInner {
    status: PresenceStatus,
    listeners: HashMap<u64, Listener>,
    next_id: u64,
}

/// Current presence value plus a multi-subscriber listener registry.
#[derive(Default)]
pub struct PresenceTracker {
    inner: RwLock<TrackerInner>,
}

impl PresenceTracker {
    /// Create a tracker with an offline initial status.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the current status wholesale and notify every listener.
    ///
    /// Listeners run with the tracker lock released, so a callback may
    /// re-enter the tracker: call [`current`](Self::current), subscribe,
    /// or drop a [`PresenceSubscription`].
    pub fn update(&self, status: PresenceStatus) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.write().expect("presence lock poisoned");
            let changed = inner.status != status;
            inner.status = status;
            if changed {
                log::debug!(
                    "Presence update: online={}, {} listener(s)",
                    inner.status.online,
                    inner.listeners.len()
                );
            }
            let listeners: Vec<Listener> = inner.listeners.values().map(Arc::clone).collect();
            (inner.status.clone(), listeners)
        };
        // Notify on every update, changed or not: each update is a fresh
        // authoritative value and listeners may track freshness.
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Snapshot of the current status.
    pub fn current(&self) -> PresenceStatus {
        self.inner.read().expect("presence lock poisoned").status.clone()
    }

    /// Register a listener called on every subsequent update.
    ///
    /// The returned handle unregisters the listener when dropped; call
    /// [`PresenceSubscription::unsubscribe`] to make that explicit.
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&PresenceStatus) + Send + Sync + 'static,
    ) -> PresenceSubscription {
        let mut inner = self.inner.write().expect("presence lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, Arc::new(listener));
        PresenceSubscription {
            id,
            tracker: Arc::downgrade(self),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.read().expect("presence lock poisoned").listeners.len()
    }

    fn remove_listener(&self, id: u64) {
        let mut inner = self.inner.write().expect("presence lock poisoned");
        inner.listeners.remove(&id);
    }
}

/// Handle for one registered presence listener.
///
/// Dropping the handle unregisters the listener.
pub struct PresenceSubscription {
    id: u64,
    tracker: Weak<PresenceTracker>,
}

impl PresenceSubscription {
    /// Unregister the listener now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for PresenceSubscription {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.remove_listener(self.id);
        }
    }
}

impl std::fmt::Debug for PresenceSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSubscription")
            .field("id", &self.id)
            .finish()
    }
}
