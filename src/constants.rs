//! Timing constants for the notification core.
//!
//! All intervals live in one place so the relationships between them stay
//! visible: the poll interval bounds worst-case delivery latency while
//! the push channel is down, and the heartbeat interval bounds presence
//! freshness.

use std::time::Duration;

// ============================================================================
// Push channel
// ============================================================================

/// Liveness probe interval while the push channel is connected.
///
/// A missed acknowledgment is not itself treated as a failure; closure
/// is detected via the transport's own close/error signal.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Fixed delay between a detected closure and the next connect attempt.
///
/// Fixed rather than exponential: the backing service is first-party and
/// a 5s retry cadence is cheap for a single connection.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Pull fallback
// ============================================================================

/// Fallback poll interval. Only acted on while the push channel is not
/// confirmed live; ticks are no-ops while connected.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Number of recent notifications fetched per poll cycle.
pub const POLL_LIMIT: usize = 20;

// ============================================================================
// Presence
// ============================================================================

/// Presence heartbeat interval. Runs for the whole session lifetime,
/// independent of push-channel state.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// Floating alert cards
// ============================================================================

/// Lifetime of a floating card from the moment it is pushed.
pub const FLOATING_TTL: Duration = Duration::from_millis(8000);

/// Maximum number of floating cards rendered simultaneously.
/// Overflow is queued, not dropped; a freed slot reveals the next card.
pub const FLOATING_VISIBLE_CAP: usize = 2;
