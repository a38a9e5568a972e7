//! Canonical notification store.
//!
//! The single reconciliation point between the push channel and the
//! fallback poller: both paths funnel every record through [`NotificationStore::upsert`],
//! which deduplicates by id. The list is ordered newest-arrival-first
//! (insertion order, not timestamp order), and the unread counter is
//! always derived from the records' read flags so the invariant
//! `unread_count == |{read == false}|` holds after every mutation.
//!
//! The store is shared as an `Arc` and read live on every poll tick;
//! nothing captures a snapshot of the list by value.

use std::sync::RwLock;

use crate::model::Notification;

#[derive(Default)]
struct StoreInner {
    /// Newest-arrival-first. Insertion happens at the head.
    items: Vec<Notification>,
    /// Maintained incrementally; always equals the unread record count.
    unread: usize,
}

/// Deduplicated, ordered collection of notification records.
#[derive(Default)]
pub struct NotificationStore {
    inner: RwLock<StoreInner>,
}

impl NotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record if its id is not yet known.
    ///
    /// Returns `true` if the record was newly inserted. If the id already
    /// exists the call is a no-op: in particular, a re-delivery with
    /// `read = false` never flips an already-read record back to unread.
    pub fn upsert(&self, notification: Notification) -> bool {
        let mut inner = self.inner.write().expect("store lock poisoned");

        if inner.items.iter().any(|n| n.id == notification.id) {
            log::debug!("Duplicate notification {} suppressed", notification.id);
            return false;
        }

        if !notification.read {
            inner.unread += 1;
        }
        inner.items.insert(0, notification);
        true
    }

    /// Mark a single record as read. Returns `true` if the record existed
    /// and was unread.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let Some(item) = inner.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if item.read {
            return false;
        }
        item.read = true;
        inner.unread -= 1;
        true
    }

    /// Mark every record as read.
    pub fn mark_all_read(&self) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        for item in &mut inner.items {
            item.read = true;
        }
        inner.unread = 0;
    }

    /// Snapshot of all records, newest arrival first.
    pub fn list(&self) -> Vec<Notification> {
        self.inner.read().expect("store lock poisoned").items.clone()
    }

    /// Current unread count.
    pub fn unread_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").unread
    }

    /// Whether a record with the given id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .expect("store lock poisoned")
            .items
            .iter()
            .any(|n| n.id == id)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().expect("store lock poisoned").items.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converge local read state toward the server's authoritative unread
    /// count.
    ///
    /// Local increments drift when records are marked read on another
    /// device or tab. If the server reports fewer unread than we hold,
    /// the oldest local unread records are marked read until the counts
    /// match. If the server reports more, local state is kept — the
    /// missing records arrive through the normal poll path.
    pub fn reconcile_unread(&self, server_count: usize) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if server_count >= inner.unread {
            return;
        }
        let mut excess = inner.unread - server_count;
        log::debug!("Reconciling unread count: local {} -> server {server_count}", inner.unread);
        for item in inner.items.iter_mut().rev() {
            if excess == 0 {
                break;
            }
            if !item.read {
                item.read = true;
                excess -= 1;
            }
        }
        inner.unread = server_count;
    }

    /// Drop all records. Used on session teardown.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.items.clear();
        inner.unread = 0;
    }
}
