//! Fallback polling loop.
//!
//! Safety net for push-channel outages: a fixed-interval tick that
//! fetches recent notifications and the authoritative unread count over
//! REST. While the push channel is confirmed live each tick is a no-op;
//! the timer keeps running either way, so coverage resumes on the very
//! next tick after a closure with no rescheduling logic.
//!
//! Every fetched record goes through the store's dedup gate, so a cycle
//! that overlaps with push delivery changes nothing. Only the newest
//! record of a batch escalates to alert surfaces, and via the poll path,
//! which never raises the modal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::api::ApiClient;
use crate::config::Config;
use crate::connection::SharedConnectionState;
use crate::dispatch::{DeliveryPath, Dispatcher};
use crate::store::NotificationStore;

/// Periodic REST fallback for the push channel.
pub struct FallbackPoller {
    api: ApiClient,
    store: Arc<NotificationStore>,
    dispatcher: Arc<Dispatcher>,
    connection: Arc<SharedConnectionState>,
    poll_interval: Duration,
    poll_limit: usize,
}

impl FallbackPoller {
    pub fn new(
        config: &Config,
        api: ApiClient,
        store: Arc<NotificationStore>,
        dispatcher: Arc<Dispatcher>,
        connection: Arc<SharedConnectionState>,
    ) -> Self {
        Self {
            api,
            store,
            dispatcher,
            connection,
            poll_interval: Duration::from_secs(config.poll_interval),
            poll_limit: config.poll_limit,
        }
    }

    /// Run the polling loop until the shutdown signal fires.
    ///
    /// The first tick fires immediately, which doubles as the initial
    /// load: the session starts the poller before the push channel has
    /// confirmed liveness.
    pub async fn run(&self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.connection.is_connected() {
                        log::trace!("Push channel live, skipping poll cycle");
                        continue;
                    }
                    self.run_cycle().await;
                }
                _ = &mut shutdown_rx => break,
            }
        }
    }

    /// Run one fetch-and-reconcile cycle.
    ///
    /// Also called once by the session when the push channel reconnects,
    /// to pick up anything delivered during the outage. Errors are
    /// transient by definition here: log and let the next tick retry.
    pub async fn run_cycle(&self) {
        match self.api.recent_notifications(self.poll_limit).await {
            Ok(batch) => self.absorb_batch(batch),
            Err(e) => log::warn!("Poll cycle fetch failed: {e:#}"),
        }

        match self.api.unread_count().await {
            Ok(count) => self.store.reconcile_unread(count),
            Err(e) => log::warn!("Unread-count fetch failed: {e:#}"),
        }
    }

    /// Upsert a newest-first batch, preserving server order in the store,
    /// and escalate the newest record if this cycle discovered it.
    fn absorb_batch(&self, batch: Vec<crate::model::Notification>) {
        let newest_id = match batch.first() {
            Some(n) => n.id.clone(),
            None => return,
        };

        let mut newest_discovered = None;
        // Oldest first, so head insertion reproduces the server's order.
        for notification in batch.into_iter().rev() {
            let is_newest = notification.id == newest_id;
            let inserted = self.store.upsert(notification.clone());
            if inserted && is_newest {
                newest_discovered = Some(notification);
            }
        }

        if let Some(notification) = newest_discovered {
            self.dispatcher.escalate(notification, DeliveryPath::Poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::AlertEvent;
    use crate::floating::FloatingQueue;
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn notification(id: &str, notification_type: &str) -> crate::model::Notification {
        crate::model::Notification {
            id: id.to_string(),
            notification_type: notification_type.to_string(),
            title: "title".to_string(),
            message: "message".to_string(),
            data: None,
            created_at: Utc::now(),
            read: false,
        }
    }

    fn poller() -> (FallbackPoller, mpsc::UnboundedReceiver<AlertEvent>) {
        let store = Arc::new(NotificationStore::new());
        let floating = Arc::new(FloatingQueue::new());
        let (dispatcher, rx) = Dispatcher::new(Arc::clone(&store), floating, false);
        let poller = FallbackPoller::new(
            &Config::default(),
            ApiClient::new("http://127.0.0.1:9", "tok"),
            store,
            dispatcher,
            SharedConnectionState::new(),
        );
        (poller, rx)
    }

    #[test]
    fn test_absorb_batch_preserves_server_order() {
        let (poller, _rx) = poller();
        poller.absorb_batch(vec![
            notification("n3", "note"),
            notification("n2", "note"),
            notification("n1", "note"),
        ]);

        let ids: Vec<String> = poller.store.list().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, ["n3", "n2", "n1"]);
    }

    #[test]
    fn test_absorb_batch_escalates_only_newest() {
        let (poller, mut rx) = poller();
        poller.absorb_batch(vec![
            notification("n2", "booking_rejected"),
            notification("n1", "booking_rejected"),
        ]);

        let mut toasts = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AlertEvent::Toast { notification, .. } = event {
                toasts.push(notification.id);
            }
        }
        assert_eq!(toasts, ["n2"]);
    }

    #[test]
    fn test_absorb_batch_skips_escalation_for_known_newest() {
        let (poller, mut rx) = poller();
        poller.store.upsert(notification("n2", "booking_rejected"));

        poller.absorb_batch(vec![
            notification("n2", "booking_rejected"),
            notification("n1", "booking_rejected"),
        ]);

        // n1 is new but not the newest; n2 is the newest but already known.
        assert!(rx.try_recv().is_err());
        assert_eq!(poller.store.len(), 2);
    }

    #[test]
    fn test_absorb_empty_batch_is_noop() {
        let (poller, mut rx) = poller();
        poller.absorb_batch(Vec::new());
        assert!(poller.store.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ticks_are_noops_while_connected() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        // The push channel is live, so no endpoint may be touched.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(NotificationStore::new());
        let floating = Arc::new(FloatingQueue::new());
        let (dispatcher, _rx) = Dispatcher::new(Arc::clone(&store), floating, false);
        let connection = SharedConnectionState::new();
        connection.set(crate::connection::ConnectionState::Connected);

        let poller = Arc::new(FallbackPoller::new(
            &Config::default(),
            ApiClient::new(server.uri(), "tok"),
            Arc::clone(&store),
            dispatcher,
            Arc::clone(&connection),
        ));

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn({
            let poller = Arc::clone(&poller);
            async move { poller.run(shutdown_rx).await }
        });

        // The interval's first tick fires immediately; give it time to
        // be processed, then stop the loop.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = shutdown_tx.send(());
        handle.await.expect("poller task panicked");

        assert!(store.is_empty());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_run_cycle_survives_unreachable_server() {
        let (poller, _rx) = poller();
        // Port 9 (discard) refuses connections; both fetches fail and the
        // cycle returns without touching state.
        poller.run_cycle().await;
        assert!(poller.store.is_empty());
    }
}
