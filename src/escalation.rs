//! Severity classification and alert-surface policy.
//!
//! Each newly-accepted notification is classified into a severity tier
//! which decides, per tier, which alert surfaces fire (ambient toast,
//! floating card, modal dialog) and for how long.
//!
//! Classification is deliberately not substring matching on the raw type
//! string — `"approval_needed"` must not classify as `"approved"`. The
//! free-form type is first tokenized into a [`NotificationKind`], then a
//! fixed kind → policy table applies. Unknown kinds fall through to the
//! lowest tier; no notification is ever dropped for being unclassifiable.

use std::time::Duration;

use crate::model::Notification;

/// Severity tier of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Rejections, losses, errors: full escalation.
    Critical,
    /// Pending/waiting items that want attention soon.
    Advisory,
    /// Approvals and successes.
    Positive,
    /// Everything else.
    Informational,
}

impl Tier {
    /// String label used in logs and UI event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Critical => "critical",
            Tier::Advisory => "advisory",
            Tier::Positive => "positive",
            Tier::Informational => "informational",
        }
    }
}

/// Toast rendering kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    /// Error-styled toast.
    Error,
    /// Info-styled toast.
    Info,
}

/// Enumerated classification of a free-form notification type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Something was approved or succeeded.
    Approved,
    /// Something was rejected, lost, or failed.
    Rejected,
    /// Something is pending or waiting on a user.
    Pending,
    /// Unrecognized type.
    Other,
}

impl NotificationKind {
    /// Classify a free-form type string by its word tokens.
    ///
    /// Tokens are split on `_`, `-`, `.` and whitespace and matched
    /// exactly, so `approval_needed` yields `Pending`-adjacent tokens
    /// rather than colliding with `approved`.
    pub fn from_type_str(notification_type: &str) -> Self {
        let lowered = notification_type.to_ascii_lowercase();
        let tokens = lowered.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace());

        // A critical token anywhere in the type outranks the others, so
        // "pending_booking_rejected" still escalates fully.
        let mut kind = Self::Other;
        for token in tokens {
            match token {
                "rejected" | "loss" | "error" | "failed" | "cancelled" => return Self::Rejected,
                "approved" | "success" | "confirmed" | "completed" => kind = Self::Approved,
                "pending" | "waiting" | "needed" | "due" => {
                    if kind == Self::Other {
                        kind = Self::Pending;
                    }
                }
                _ => {}
            }
        }
        kind
    }
}

/// The alert surfaces a classified notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Severity tier.
    pub tier: Tier,
    /// Toast styling.
    pub toast_kind: ToastKind,
    /// Toast display duration.
    pub toast_duration: Duration,
    /// Whether a floating card should be shown.
    pub show_floating: bool,
    /// Whether the modal "latest notification" pointer should be set
    /// (push-delivery path only; the poll path never sets it).
    pub show_modal: bool,
}

/// Stateless classifier mapping notifications to escalation policies.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscalationEngine;

impl EscalationEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Classify a notification into its escalation policy.
    pub fn classify(&self, notification: &Notification) -> EscalationPolicy {
        let kind = NotificationKind::from_type_str(&notification.notification_type);
        let policy = Self::policy_for(kind);
        log::debug!(
            "Classified {} ({}) as {} tier",
            notification.id,
            notification.notification_type,
            policy.tier.as_str()
        );
        policy
    }

    /// Fixed kind → policy table.
    fn policy_for(kind: NotificationKind) -> EscalationPolicy {
        match kind {
            NotificationKind::Rejected => EscalationPolicy {
                tier: Tier::Critical,
                toast_kind: ToastKind::Error,
                toast_duration: Duration::from_millis(8000),
                show_floating: true,
                show_modal: true,
            },
            NotificationKind::Pending => EscalationPolicy {
                tier: Tier::Advisory,
                toast_kind: ToastKind::Info,
                toast_duration: Duration::from_millis(5000),
                show_floating: false,
                show_modal: false,
            },
            NotificationKind::Approved => EscalationPolicy {
                tier: Tier::Positive,
                toast_kind: ToastKind::Info,
                toast_duration: Duration::from_millis(4000),
                show_floating: false,
                show_modal: false,
            },
            NotificationKind::Other => EscalationPolicy {
                tier: Tier::Informational,
                toast_kind: ToastKind::Info,
                toast_duration: Duration::from_millis(4000),
                show_floating: false,
                show_modal: false,
            },
        }
    }
}
