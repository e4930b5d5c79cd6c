use async_trait::async_trait;
use orgauth_core::{AppResult, EmployeeId};

/// Lifecycle event an employee is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Leave request recorded.
    LeaveApplied,
    /// Leave accepted.
    LeaveAccepted,
    /// Leave rejected.
    LeaveRejected,
    /// Delegated authority received.
    DelegationReceived,
    /// Leave over; authority returned.
    LeaveEnded,
    /// Delegated authority withdrawn.
    DelegationEnded,
    /// Suspended, blocked or terminated.
    StatusRestricted,
    /// Restriction lifted.
    StatusRestored,
}

impl NotificationKind {
    /// Returns a stable value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeaveApplied => "leave_applied",
            Self::LeaveAccepted => "leave_accepted",
            Self::LeaveRejected => "leave_rejected",
            Self::DelegationReceived => "delegation_received",
            Self::LeaveEnded => "leave_ended",
            Self::DelegationEnded => "delegation_ended",
            Self::StatusRestricted => "status_restricted",
            Self::StatusRestored => "status_restored",
        }
    }
}

/// Message sent after a committed lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Employee the message concerns.
    pub recipient: EmployeeId,
    /// Event kind.
    pub kind: NotificationKind,
    /// Short subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Outbound notification port. Delivery is best effort.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Delivers one notification.
    async fn send(&self, notification: Notification) -> AppResult<()>;
}
