//! Push-channel lifecycle management.
//!
//! Owns the single persistent WebSocket connection for a session:
//! connect, liveness probing, closure detection, and reconnection on a
//! fixed delay. Inbound tagged records are dispatched as
//! [`ChannelEvent`]s to the session's event loop; the manager itself
//! holds no notification or presence state.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──open──► Connected
//!       ▲                         ▲                    │
//!       │                         │ fixed delay        │ close/error
//!  disconnect()              ReconnectPending ◄────────┘
//! ```
//!
//! The whole lifecycle runs in one spawned task, so at most one
//! reconnect delay is ever pending: a new close event cannot stack
//! timers. `disconnect()` cancels the task from any state.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

use crate::config::Config;
use crate::error::NotifyError;
use crate::model::{Notification, PresenceStatus};
use crate::protocol::{ClientEvent, ServerEvent};

/// Concrete WebSocket stream type.
type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;
type WsSource = futures_util::stream::SplitStream<WsStream>;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying to be.
    #[default]
    Disconnected,
    /// Connect attempt in flight.
    Connecting,
    /// Channel open and confirmed live.
    Connected,
    /// Closure detected; reconnect timer pending.
    ReconnectPending,
}

impl ConnectionState {
    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ReconnectPending => "reconnect_pending",
        }
    }
}

/// Connection state observable from outside the connection task.
///
/// The fallback poller reads this on every tick to decide whether the
/// push channel is confirmed live.
#[derive(Debug, Default)]
pub struct SharedConnectionState {
    state: RwLock<ConnectionState>,
}

impl SharedConnectionState {
    /// Create new shared state, initially `Disconnected`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current state.
    pub fn get(&self) -> ConnectionState {
        *self.state.read().expect("state lock poisoned")
    }

    /// Whether the channel is confirmed live.
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    pub(crate) fn set(&self, new_state: ConnectionState) {
        let mut state = self.state.write().expect("state lock poisoned");
        if *state != new_state {
            log::debug!("Push channel: {} -> {}", state.as_str(), new_state.as_str());
        }
        *state = new_state;
    }
}

/// Event from the connection task, consumed by the session event loop.
#[derive(Debug)]
pub enum ChannelEvent {
    /// A notification record arrived on the push channel.
    Notification(Notification),
    /// A presence update arrived on the push channel.
    PresenceChange(PresenceStatus),
    /// The channel (re)opened. The session runs one poll cycle on this
    /// to reconcile anything missed while disconnected.
    Connected,
    /// The channel closed or errored; reconnection is pending.
    Disconnected,
}

/// Manages the lifecycle of the single persistent push connection.
pub struct ConnectionManager {
    server_url: String,
    token: String,
    ping_interval: Duration,
    reconnect_delay: Duration,
    state: Arc<SharedConnectionState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ConnectionManager {
    /// Create a manager for the given server and session credential.
    pub fn new(config: &Config, token: impl Into<String>) -> Self {
        Self {
            server_url: config.server_url.clone(),
            token: token.into(),
            ping_interval: Duration::from_secs(config.ping_interval),
            reconnect_delay: Duration::from_secs(config.reconnect_delay),
            state: SharedConnectionState::new(),
            shutdown_tx: None,
        }
    }

    /// Shared state handle for external observation (poller gating).
    pub fn shared_state(&self) -> Arc<SharedConnectionState> {
        Arc::clone(&self.state)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Start the connection task.
    ///
    /// Events are delivered on `events_tx` until `disconnect()` is
    /// called. Errors if the manager is already running.
    pub fn connect(
        &mut self,
        events_tx: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<(), NotifyError> {
        if self.shutdown_tx.is_some() {
            return Err(NotifyError::ConnectionFailed("already connected".into()));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let ws_url = websocket_url(&self.server_url, &self.token);
        let state = Arc::clone(&self.state);
        let ping_interval = self.ping_interval;
        let reconnect_delay = self.reconnect_delay;

        tokio::spawn(async move {
            run_connection_loop(
                ws_url,
                ping_interval,
                reconnect_delay,
                state,
                events_tx,
                shutdown_rx,
            )
            .await;
        });

        Ok(())
    }

    /// Stop the connection task from any state, cancelling a pending
    /// reconnect timer and closing the channel.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.state.set(ConnectionState::Disconnected);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("server_url", &self.server_url)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

/// Build the push-channel URL, carrying the credential as a query
/// parameter.
fn websocket_url(server_url: &str, token: &str) -> String {
    format!(
        "{}/ws/notifications?token={token}",
        http_to_ws_scheme(server_url)
    )
}

/// Convert an HTTP(S) URL to WS(S) scheme; `ws://`/`wss://` pass through.
fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else {
        url.replace("https://", "wss://").replace("http://", "ws://")
    }
}

/// Run connect/reconnect cycles until shutdown.
async fn run_connection_loop(
    ws_url: String,
    ping_interval: Duration,
    reconnect_delay: Duration,
    state: Arc<SharedConnectionState>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        state.set(ConnectionState::Connecting);

        match tokio_tungstenite::connect_async(ws_url.as_str()).await {
            Ok((ws_stream, _response)) => {
                log::info!("Push channel connected");
                state.set(ConnectionState::Connected);
                let _ = events_tx.send(ChannelEvent::Connected);

                let (write, read) = ws_stream.split();
                let shutdown_requested = run_message_loop(
                    write,
                    read,
                    ping_interval,
                    &events_tx,
                    &mut shutdown_rx,
                )
                .await;

                let _ = events_tx.send(ChannelEvent::Disconnected);
                if shutdown_requested {
                    break;
                }
                log::warn!("Push channel disconnected");
            }
            Err(e) => {
                log::warn!("Push channel connect failed: {e}");
            }
        }

        // Fixed delay, single pending timer: this loop is the only place
        // a reconnect is ever scheduled.
        state.set(ConnectionState::ReconnectPending);
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = &mut shutdown_rx => break,
        }
    }

    state.set(ConnectionState::Disconnected);
}

/// Run the read/probe loop until close, error, or shutdown.
///
/// Returns `true` if exit was due to the shutdown signal; the caller
/// breaks out of the reconnection loop in that case.
async fn run_message_loop(
    mut write: WsSink,
    mut read: WsSource,
    ping_interval: Duration,
    events_tx: &mpsc::UnboundedSender<ChannelEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> bool {
    let mut probe = tokio::time::interval_at(
        tokio::time::Instant::now() + ping_interval,
        ping_interval,
    );

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_frame(&text, events_tx);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            log::warn!("Failed to answer transport ping");
                            return false;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        log::info!("Push channel closed by server");
                        return false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("Push channel error: {e}");
                        return false;
                    }
                    None => {
                        log::info!("Push channel stream ended");
                        return false;
                    }
                }
            }

            // Liveness probe. A missed pong is not a failure trigger;
            // only the write failing counts as closure evidence.
            _ = probe.tick() => {
                let frame = ClientEvent::Ping.to_json();
                if write.send(Message::Text(frame.into())).await.is_err() {
                    log::warn!("Liveness probe write failed");
                    return false;
                }
            }

            _ = &mut *shutdown_rx => {
                let _ = write.send(Message::Close(None)).await;
                return true;
            }
        }
    }
}

/// Parse a text frame and forward it; unparseable frames are dropped.
fn dispatch_frame(text: &str, events_tx: &mpsc::UnboundedSender<ChannelEvent>) {
    match ServerEvent::parse(text) {
        Some(ServerEvent::Notification(n)) => {
            let _ = events_tx.send(ChannelEvent::Notification(n));
        }
        Some(ServerEvent::PresenceChange(status)) => {
            let _ = events_tx.send(ChannelEvent::PresenceChange(status));
        }
        Some(ServerEvent::Pong) => {
            log::trace!("Liveness probe acknowledged");
        }
        None => {
            log::debug!("Dropping unparseable frame ({} bytes)", text.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_to_ws_scheme() {
        assert_eq!(http_to_ws_scheme("https://example.com"), "wss://example.com");
        assert_eq!(http_to_ws_scheme("http://localhost:8000"), "ws://localhost:8000");
        assert_eq!(http_to_ws_scheme("ws://localhost:8000"), "ws://localhost:8000");
        assert_eq!(http_to_ws_scheme("wss://example.com"), "wss://example.com");
    }

    #[test]
    fn test_websocket_url_carries_token() {
        assert_eq!(
            websocket_url("https://console.example.com", "tok-1"),
            "wss://console.example.com/ws/notifications?token=tok-1"
        );
    }

    #[test]
    fn test_initial_state_is_disconnected() {
        let manager = ConnectionManager::new(&Config::default(), "tok");
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_dispatch_frame_routes_by_tag() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        dispatch_frame(
            r#"{"event":"presence_change","data":{"online":true}}"#,
            &tx,
        );
        assert!(matches!(rx.try_recv(), Ok(ChannelEvent::PresenceChange(s)) if s.online));

        dispatch_frame("garbage", &tx);
        assert!(rx.try_recv().is_err(), "unparseable frames are dropped");

        dispatch_frame(r#"{"event":"pong"}"#, &tx);
        assert!(rx.try_recv().is_err(), "pong is consumed internally");
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let mut manager = ConnectionManager::new(&Config::default(), "tok");
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.connect(tx.clone()).expect("first connect");
        assert!(manager.connect(tx).is_err());
        manager.disconnect();
    }

    #[tokio::test]
    async fn test_disconnect_sets_disconnected() {
        let mut manager = ConnectionManager::new(&Config::default(), "tok");
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.connect(tx).expect("connect");
        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }
}
