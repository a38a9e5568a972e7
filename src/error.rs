//! Error types for the notification core.
//!
//! Nothing in this subsystem is fatal to the host application: transport
//! failures feed the reconnect loop, parse failures drop the offending
//! record, and pull failures retry on the next scheduled tick.

/// Errors surfaced by the push channel and session lifecycle.
#[derive(Debug)]
pub enum NotifyError {
    /// WebSocket connect or handshake failed, or a session/connection
    /// was started twice.
    ConnectionFailed(String),
    /// A session operation was invoked without an active session.
    NoSession,
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(msg) => write!(f, "Connection failed: {msg}"),
            Self::NoSession => write!(f, "No active session"),
        }
    }
}

impl std::error::Error for NotifyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(
            NotifyError::ConnectionFailed("refused".into()).to_string(),
            "Connection failed: refused"
        );
        assert_eq!(NotifyError::NoSession.to_string(), "No active session");
    }
}
