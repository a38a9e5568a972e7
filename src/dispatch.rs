//! Escalation boundary between delivery paths and alert surfaces.
//!
//! Both the push channel and the fallback poller hand accepted
//! notifications to the [`Dispatcher`], which funnels them through the
//! store's `upsert` (the dedup point), classifies the newly-inserted
//! ones, and fires the appropriate surfaces: a toast event, a floating
//! card, and — for the push path only — the modal "latest" pointer.
//!
//! UI consumers receive surface activations as [`AlertEvent`]s over a
//! single channel, so renderers contain no protocol or dedup logic.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::escalation::{EscalationEngine, Tier, ToastKind};
use crate::floating::FloatingQueue;
use crate::model::{Notification, PresenceStatus};
use crate::store::NotificationStore;

/// Which channel delivered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    /// Persistent push connection.
    Push,
    /// Periodic fallback poll.
    Poll,
}

/// Alert-surface activation delivered to UI consumers.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    /// Show an ambient toast.
    Toast {
        /// The notification behind the toast.
        notification: Notification,
        /// Severity tier label.
        tier: Tier,
        /// Toast styling.
        kind: ToastKind,
        /// Display duration.
        duration: Duration,
        /// Whether the host should play an alert sound.
        audible: bool,
    },
    /// A critical notification escalated to the modal dialog.
    /// Also retrievable via [`Dispatcher::take_latest_modal`].
    Modal {
        /// The escalated notification.
        notification: Notification,
    },
    /// Push-channel connection state changed.
    ConnectionChanged {
        /// Whether the push channel is currently confirmed live.
        connected: bool,
    },
    /// Presence status changed (mirrors the tracker for consumers that
    /// prefer a single event stream).
    PresenceChanged(PresenceStatus),
}

/// Routes accepted notifications to the alert surfaces.
pub struct Dispatcher {
    store: Arc<NotificationStore>,
    floating: Arc<FloatingQueue>,
    engine: EscalationEngine,
    /// Latest critical notification from the push path, consumed by the
    /// modal dialog. The poll path never writes here.
    latest_modal: RwLock<Option<Notification>>,
    events_tx: mpsc::UnboundedSender<AlertEvent>,
    audible_alerts: bool,
}

impl Dispatcher {
    /// Create a dispatcher wired to the given store and floating queue.
    /// Returns the dispatcher and the UI-facing event receiver.
    pub fn new(
        store: Arc<NotificationStore>,
        floating: Arc<FloatingQueue>,
        audible_alerts: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<AlertEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Self {
            store,
            floating,
            engine: EscalationEngine::new(),
            latest_modal: RwLock::new(None),
            events_tx,
            audible_alerts,
        });
        (dispatcher, events_rx)
    }

    /// Accept a notification from a delivery path.
    ///
    /// Upserts into the store; if the record was already known this is a
    /// no-op (duplicate suppression at the escalation boundary, not just
    /// the storage boundary). Returns `true` if the record was new.
    pub fn deliver(&self, notification: Notification, path: DeliveryPath) -> bool {
        let inserted = self.store.upsert(notification.clone());
        if !inserted {
            return false;
        }
        self.escalate(notification, path);
        true
    }

    /// Fire alert surfaces for a notification already accepted by the
    /// store. The poller uses this directly for the single newest item
    /// its cycle discovered.
    pub fn escalate(&self, notification: Notification, path: DeliveryPath) {
        let policy = self.engine.classify(&notification);

        if policy.show_floating {
            self.floating.push(notification.clone());
        }

        if policy.show_modal && path == DeliveryPath::Push {
            *self.latest_modal.write().expect("modal lock poisoned") =
                Some(notification.clone());
            let _ = self.events_tx.send(AlertEvent::Modal {
                notification: notification.clone(),
            });
        }

        let audible = self.audible_alerts && policy.tier == Tier::Critical;
        let _ = self.events_tx.send(AlertEvent::Toast {
            notification,
            tier: policy.tier,
            kind: policy.toast_kind,
            duration: policy.toast_duration,
            audible,
        });
    }

    /// Forward a non-notification event to UI consumers.
    pub fn emit(&self, event: AlertEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Peek at the latest modal-escalated notification.
    pub fn latest_modal(&self) -> Option<Notification> {
        self.latest_modal.read().expect("modal lock poisoned").clone()
    }

    /// Consume the latest modal-escalated notification, clearing the
    /// pointer so the dialog fires once per escalation.
    pub fn take_latest_modal(&self) -> Option<Notification> {
        self.latest_modal.write().expect("modal lock poisoned").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(id: &str, notification_type: &str) -> Notification {
        Notification {
            id: id.to_string(),
            notification_type: notification_type.to_string(),
            title: "title".to_string(),
            message: "message".to_string(),
            data: None,
            created_at: Utc::now(),
            read: false,
        }
    }

    fn dispatcher() -> (Arc<Dispatcher>, mpsc::UnboundedReceiver<AlertEvent>) {
        let store = Arc::new(NotificationStore::new());
        let floating = Arc::new(FloatingQueue::new());
        Dispatcher::new(store, floating, false)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AlertEvent>) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_critical_push_fires_all_surfaces() {
        let (dispatcher, mut rx) = dispatcher();
        assert!(dispatcher.deliver(notification("n1", "booking_rejected"), DeliveryPath::Push));

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, AlertEvent::Modal { .. })));
        assert!(events.iter().any(
            |e| matches!(e, AlertEvent::Toast { kind: ToastKind::Error, tier: Tier::Critical, .. })
        ));
        assert_eq!(dispatcher.latest_modal().map(|n| n.id), Some("n1".to_string()));
    }

    #[test]
    fn test_advisory_fires_toast_only() {
        let (dispatcher, mut rx) = dispatcher();
        dispatcher.deliver(notification("n1", "booking_pending"), DeliveryPath::Push);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            AlertEvent::Toast { tier: Tier::Advisory, kind: ToastKind::Info, .. }
        ));
        assert!(dispatcher.latest_modal().is_none());
    }

    #[test]
    fn test_duplicate_delivery_does_not_re_escalate() {
        let (dispatcher, mut rx) = dispatcher();
        assert!(dispatcher.deliver(notification("n1", "booking_rejected"), DeliveryPath::Push));
        drain(&mut rx);

        // Same id arrives via the other channel.
        assert!(!dispatcher.deliver(notification("n1", "booking_rejected"), DeliveryPath::Poll));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_poll_path_never_sets_modal_pointer() {
        let (dispatcher, mut rx) = dispatcher();
        dispatcher.deliver(notification("n1", "booking_rejected"), DeliveryPath::Poll);

        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, AlertEvent::Modal { .. })));
        assert!(dispatcher.latest_modal().is_none());
        // The floating card and toast still fire.
        assert!(events.iter().any(|e| matches!(e, AlertEvent::Toast { .. })));
    }

    #[test]
    fn test_take_latest_modal_clears_pointer() {
        let (dispatcher, _rx) = dispatcher();
        dispatcher.deliver(notification("n1", "booking_rejected"), DeliveryPath::Push);

        assert_eq!(dispatcher.take_latest_modal().map(|n| n.id), Some("n1".to_string()));
        assert!(dispatcher.take_latest_modal().is_none());
    }

    #[test]
    fn test_audible_flag_only_on_critical() {
        let store = Arc::new(NotificationStore::new());
        let floating = Arc::new(FloatingQueue::new());
        let (dispatcher, mut rx) = Dispatcher::new(store, floating, true);

        dispatcher.deliver(notification("a", "booking_rejected"), DeliveryPath::Push);
        dispatcher.deliver(notification("b", "client_approved"), DeliveryPath::Push);

        let audibles: Vec<bool> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                AlertEvent::Toast { audible, .. } => Some(audible),
                _ => None,
            })
            .collect();
        assert_eq!(audibles, vec![true, false]);
    }
}
