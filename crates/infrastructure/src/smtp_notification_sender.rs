//! SMTP notification sender using the `lettre` crate.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use orgauth_application::{Notification, NotificationSender};
use orgauth_core::{AppError, AppResult};

/// SMTP notification configuration.
#[derive(Clone)]
pub struct SmtpNotificationConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Sender address.
    pub from_address: String,
    /// Mailbox that receives lifecycle notifications, e.g. the HR inbox.
    pub to_address: String,
}

/// Notification sender that relays lifecycle messages over SMTP.
///
/// Employee contact data lives outside this service, so every message goes to
/// the configured mailbox with the employee named in the body.
#[derive(Clone)]
pub struct SmtpNotificationSender {
    config: SmtpNotificationConfig,
}

impl SmtpNotificationSender {
    /// Creates a new SMTP notification sender.
    #[must_use]
    pub fn new(config: SmtpNotificationConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, notification: &Notification) -> AppResult<Message> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid from address: {error}")))?;

        let to: Mailbox = self
            .config
            .to_address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid recipient address: {error}")))?;

        let body = format!(
            "Employee: {}\nEvent: {}\n\n{}",
            notification.recipient,
            notification.kind.as_str(),
            notification.body
        );

        Message::builder()
            .from(from)
            .to(to)
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|error| AppError::Internal(format!("failed to build notification: {error}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        let message = self.build_message(&notification)?;

        let credentials =
            Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|error| {
                AppError::Internal(format!("failed to create SMTP transport: {error}"))
            })?
            .port(self.config.port)
            .credentials(credentials)
            .build();

        mailer
            .send(message)
            .await
            .map_err(|error| AppError::Internal(format!("failed to send notification: {error}")))?;

        Ok(())
    }
}
