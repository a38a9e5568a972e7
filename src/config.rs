//! Configuration for the notification core.
//!
//! The host application constructs a [`Config`] (usually from its own
//! settings screen) and hands it to [`crate::session::NotificationCenter`].
//! Environment variables prefixed `CONSOLE_NOTIFY_` override individual
//! fields, which keeps integration tests and staging deployments from
//! needing code changes.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunables for the notification core.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Base URL of the backing service (http/https; ws scheme is derived).
    pub server_url: String,
    /// Seconds between fallback poll cycles.
    pub poll_interval: u64,
    /// Number of recent notifications fetched per poll cycle.
    pub poll_limit: usize,
    /// Seconds between liveness probes on the push channel.
    pub ping_interval: u64,
    /// Seconds between presence heartbeats.
    pub heartbeat_interval: u64,
    /// Seconds between a detected closure and the next connect attempt.
    pub reconnect_delay: u64,
    /// Milliseconds a floating card stays alive after it is pushed.
    pub floating_ttl_ms: u64,
    /// Maximum number of floating cards rendered at once; overflow is
    /// queued until a slot frees up.
    pub floating_visible_cap: usize,
    /// When true, critical-tier toast events carry `audible = true` so the
    /// host may play an alert sound. Off by default.
    pub audible_alerts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            poll_interval: constants::POLL_INTERVAL.as_secs(),
            poll_limit: constants::POLL_LIMIT,
            ping_interval: constants::PING_INTERVAL.as_secs(),
            heartbeat_interval: constants::HEARTBEAT_INTERVAL.as_secs(),
            reconnect_delay: constants::RECONNECT_DELAY.as_secs(),
            floating_ttl_ms: constants::FLOATING_TTL.as_millis() as u64,
            floating_visible_cap: constants::FLOATING_VISIBLE_CAP,
            audible_alerts: false,
        }
    }
}

impl Config {
    /// Build a config for the given server, with env overrides applied.
    pub fn for_server(server_url: impl Into<String>) -> Self {
        let mut config = Self {
            server_url: server_url.into(),
            ..Self::default()
        };
        config.apply_env_overrides();
        config
    }

    /// Apply `CONSOLE_NOTIFY_*` environment variable overrides.
    ///
    /// Unparseable values are ignored with a warning rather than failing;
    /// a bad env var should never take the alert pipeline down.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CONSOLE_NOTIFY_SERVER_URL") {
            self.server_url = url;
        }
        Self::override_u64("CONSOLE_NOTIFY_POLL_INTERVAL", &mut self.poll_interval);
        Self::override_u64("CONSOLE_NOTIFY_PING_INTERVAL", &mut self.ping_interval);
        Self::override_u64(
            "CONSOLE_NOTIFY_HEARTBEAT_INTERVAL",
            &mut self.heartbeat_interval,
        );
        Self::override_u64("CONSOLE_NOTIFY_RECONNECT_DELAY", &mut self.reconnect_delay);
        Self::override_u64("CONSOLE_NOTIFY_FLOATING_TTL_MS", &mut self.floating_ttl_ms);
        Self::override_usize(
            "CONSOLE_NOTIFY_FLOATING_VISIBLE_CAP",
            &mut self.floating_visible_cap,
        );
        if let Ok(val) = std::env::var("CONSOLE_NOTIFY_AUDIBLE_ALERTS") {
            self.audible_alerts = matches!(val.as_str(), "1" | "true" | "on");
        }
    }

    fn override_u64(var: &str, field: &mut u64) {
        if let Ok(val) = std::env::var(var) {
            match val.parse() {
                Ok(parsed) => *field = parsed,
                Err(_) => log::warn!("Ignoring unparseable {var}={val}"),
            }
        }
    }

    fn override_usize(var: &str, field: &mut usize) {
        if let Ok(val) = std::env::var(var) {
            match val.parse() {
                Ok(parsed) => *field = parsed,
                Err(_) => log::warn!("Ignoring unparseable {var}={val}"),
            }
        }
    }
}
