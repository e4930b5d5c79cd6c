//! Console notification sender for development. Logs notifications to tracing output.

use async_trait::async_trait;
use orgauth_application::{Notification, NotificationSender};
use orgauth_core::AppResult;
use tracing::info;

/// Development notification sender that logs every message.
#[derive(Clone, Default)]
pub struct ConsoleNotificationSender;

impl ConsoleNotificationSender {
    /// Creates a new console notification sender.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for ConsoleNotificationSender {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        info!(
            recipient = %notification.recipient,
            kind = notification.kind.as_str(),
            "--- NOTIFICATION (console) ---\nSubject: {}\n\n{}\n--- END NOTIFICATION ---",
            notification.subject,
            notification.body
        );

        Ok(())
    }
}
