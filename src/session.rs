//! Per-session orchestration.
//!
//! [`NotificationCenter`] is the host application's entry point: one
//! instance per signed-in session. `start()` wires up and spawns the
//! background tasks — push connection, channel event consumer, fallback
//! poller, presence heartbeat — and `shutdown()` tears them all down and
//! clears session-scoped state, so a sign-out leaves no timers running
//! and no stale cards on screen.
//!
//! All shared state (store, floating queue, presence tracker, dispatcher)
//! is owned here as `Arc`s and handed to the tasks by clone; accessors
//! expose the same `Arc`s to the host UI.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

use crate::api::ApiClient;
use crate::config::Config;
use crate::connection::{ChannelEvent, ConnectionManager, ConnectionState, SharedConnectionState};
use crate::dispatch::{AlertEvent, DeliveryPath, Dispatcher};
use crate::error::NotifyError;
use crate::floating::FloatingQueue;
use crate::model::{Notification, PresenceStatus};
use crate::poller::FallbackPoller;
use crate::presence::PresenceTracker;
use crate::store::NotificationStore;

/// Handles for a started session's background tasks.
struct ActiveSession {
    api: ApiClient,
    connection: ConnectionManager,
    events_shutdown: Option<oneshot::Sender<()>>,
    poller_shutdown: Option<oneshot::Sender<()>>,
    heartbeat_shutdown: Option<oneshot::Sender<()>>,
}

impl ActiveSession {
    fn stop(&mut self) {
        for tx in [
            self.events_shutdown.take(),
            self.poller_shutdown.take(),
            self.heartbeat_shutdown.take(),
        ]
        .into_iter()
        .flatten()
        {
            let _ = tx.send(());
        }
        self.connection.disconnect();
    }
}

/// Session-scoped notification and presence hub.
pub struct NotificationCenter {
    config: Config,
    store: Arc<NotificationStore>,
    floating: Arc<FloatingQueue>,
    presence: Arc<PresenceTracker>,
    dispatcher: Arc<Dispatcher>,
    alert_rx: Option<mpsc::UnboundedReceiver<AlertEvent>>,
    session: Option<ActiveSession>,
}

impl NotificationCenter {
    /// Create an idle center. No tasks run until [`start`](Self::start).
    pub fn new(config: Config) -> Self {
        let store = Arc::new(NotificationStore::new());
        let floating = Arc::new(FloatingQueue::with_limits(
            Duration::from_millis(config.floating_ttl_ms),
            config.floating_visible_cap,
        ));
        let (dispatcher, alert_rx) =
            Dispatcher::new(Arc::clone(&store), Arc::clone(&floating), config.audible_alerts);

        Self {
            config,
            store,
            floating,
            presence: PresenceTracker::new(),
            dispatcher,
            alert_rx: Some(alert_rx),
            session: None,
        }
    }

    /// Start the session's background tasks with the given credential.
    ///
    /// Errors if a session is already running; call
    /// [`shutdown`](Self::shutdown) first to switch credentials.
    pub fn start(&mut self, token: impl Into<String>) -> Result<(), NotifyError> {
        if self.session.is_some() {
            return Err(NotifyError::ConnectionFailed(
                "session already started".into(),
            ));
        }

        let token = token.into();
        let api = ApiClient::new(self.config.server_url.clone(), token.clone());

        let mut connection = ConnectionManager::new(&self.config, token);
        let connection_state = connection.shared_state();
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        connection.connect(channel_tx)?;

        let poller = Arc::new(FallbackPoller::new(
            &self.config,
            api.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.dispatcher),
            Arc::clone(&connection_state),
        ));

        let (events_shutdown, events_shutdown_rx) = oneshot::channel();
        tokio::spawn(run_event_loop(
            channel_rx,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.presence),
            Arc::clone(&poller),
            events_shutdown_rx,
        ));

        let (poller_shutdown, poller_shutdown_rx) = oneshot::channel();
        tokio::spawn({
            let poller = Arc::clone(&poller);
            async move { poller.run(poller_shutdown_rx).await }
        });

        let (heartbeat_shutdown, heartbeat_shutdown_rx) = oneshot::channel();
        tokio::spawn(run_heartbeat_loop(
            api.clone(),
            Arc::clone(&self.presence),
            Arc::clone(&self.dispatcher),
            connection_state,
            Duration::from_secs(self.config.heartbeat_interval),
            heartbeat_shutdown_rx,
        ));

        self.session = Some(ActiveSession {
            api,
            connection,
            events_shutdown: Some(events_shutdown),
            poller_shutdown: Some(poller_shutdown),
            heartbeat_shutdown: Some(heartbeat_shutdown),
        });

        log::info!("Notification session started");
        Ok(())
    }

    /// Stop all background tasks and clear session-scoped state.
    ///
    /// Idempotent. The store, floating queue, and presence status reset
    /// so a subsequent sign-in starts clean.
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            log::info!("Notification session stopped");
        }
        self.store.clear();
        self.floating.clear();
        self.presence.update(PresenceStatus::default());
        self.dispatcher.take_latest_modal();
    }

    /// Canonical notification store.
    pub fn store(&self) -> Arc<NotificationStore> {
        Arc::clone(&self.store)
    }

    /// Floating-card queue.
    pub fn floating(&self) -> Arc<FloatingQueue> {
        Arc::clone(&self.floating)
    }

    /// Presence tracker.
    pub fn presence(&self) -> Arc<PresenceTracker> {
        Arc::clone(&self.presence)
    }

    /// Escalation dispatcher (modal pointer access).
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Current push-channel state.
    pub fn connection_state(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map(|s| s.connection.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Whether the push channel is confirmed live.
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Take the UI-facing alert event receiver. Single consumer: returns
    /// `None` after the first call.
    pub fn take_alert_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<AlertEvent>> {
        self.alert_rx.take()
    }

    /// Mark one notification read.
    ///
    /// Local state mutates immediately; the server write-through failing
    /// is logged and left for the next poll cycle's reconcile. Returns
    /// whether a local record flipped from unread.
    pub async fn mark_read(&self, id: &str) -> bool {
        let flipped = self.store.mark_read(id);
        if flipped {
            if let Some(session) = &self.session {
                if let Err(e) = session.api.mark_read(id).await {
                    log::warn!("Mark-read write-through failed for {id}: {e:#}");
                }
            }
        }
        flipped
    }

    /// Mark every notification read, with server write-through.
    pub async fn mark_all_read(&self) {
        self.store.mark_all_read();
        if let Some(session) = &self.session {
            if let Err(e) = session.api.mark_all_read().await {
                log::warn!("Read-all write-through failed: {e:#}");
            }
        }
    }

    /// Ask the server to emit a synthetic test notification. It arrives
    /// back through the normal delivery paths.
    pub async fn trigger_test(&self) -> Result<Notification> {
        let session = self.session.as_ref().ok_or(NotifyError::NoSession)?;
        session.api.trigger_test().await
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }
}

/// Consume push-channel events until shutdown or channel close.
async fn run_event_loop(
    mut channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    dispatcher: Arc<Dispatcher>,
    presence: Arc<PresenceTracker>,
    poller: Arc<FallbackPoller>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = channel_rx.recv() => {
                match event {
                    Some(ChannelEvent::Notification(n)) => {
                        dispatcher.deliver(n, DeliveryPath::Push);
                    }
                    Some(ChannelEvent::PresenceChange(status)) => {
                        presence.update(status.clone());
                        dispatcher.emit(AlertEvent::PresenceChanged(status));
                    }
                    Some(ChannelEvent::Connected) => {
                        dispatcher.emit(AlertEvent::ConnectionChanged { connected: true });
                        // One immediate cycle reconciles anything that
                        // arrived while the channel was down.
                        poller.run_cycle().await;
                    }
                    Some(ChannelEvent::Disconnected) => {
                        dispatcher.emit(AlertEvent::ConnectionChanged { connected: false });
                    }
                    None => break,
                }
            }
            _ = &mut shutdown_rx => break,
        }
    }
}

/// Post presence heartbeats on a fixed interval.
///
/// Heartbeats post unconditionally; the server is the arbiter of this
/// user's visibility. While the push channel is down the loop also pulls
/// the privileged-operator status directly, since `presence_change`
/// frames cannot arrive.
async fn run_heartbeat_loop(
    api: ApiClient,
    presence: Arc<PresenceTracker>,
    dispatcher: Arc<Dispatcher>,
    connection: Arc<SharedConnectionState>,
    interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = api.heartbeat().await {
                    log::warn!("Heartbeat failed: {e:#}");
                }

                if !connection.is_connected() {
                    match api.pe_status().await {
                        Ok(status) => {
                            presence.update(status.clone());
                            dispatcher.emit(AlertEvent::PresenceChanged(status));
                        }
                        Err(e) => log::warn!("Presence pull failed: {e:#}"),
                    }
                }
            }
            _ = &mut shutdown_rx => break,
        }
    }
}
