use async_trait::async_trait;
use orgauth_application::{AuditEvent, AuditRepository};
use orgauth_core::AppResult;

use super::InMemoryOrganizationStore;

#[async_trait]
impl AuditRepository for InMemoryOrganizationStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        tracing::debug!(
            subject = %event.subject,
            action = event.action.as_str(),
            resource_id = %event.resource_id,
            "audit event recorded in memory"
        );
        self.state.write().await.audit_events.push(event);

        Ok(())
    }
}
