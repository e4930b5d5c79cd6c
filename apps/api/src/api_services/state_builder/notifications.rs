use std::sync::Arc;

use orgauth_application::NotificationSender;
use orgauth_infrastructure::{
    ConsoleNotificationSender, SmtpNotificationConfig, SmtpNotificationSender,
};

use crate::api_config::{ApiConfig, NotificationProviderConfig};

pub(super) fn build_notification_sender(config: &ApiConfig) -> Arc<dyn NotificationSender> {
    match &config.notification_provider {
        NotificationProviderConfig::Console => Arc::new(ConsoleNotificationSender::new()),
        NotificationProviderConfig::Smtp(smtp) => {
            Arc::new(SmtpNotificationSender::new(SmtpNotificationConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                from_address: smtp.from_address.clone(),
                to_address: smtp.to_address.clone(),
            }))
        }
    }
}
