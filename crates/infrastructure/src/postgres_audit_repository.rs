use async_trait::async_trait;
use sqlx::PgPool;

use orgauth_application::{AuditEvent, AuditRepository};
use orgauth_core::{AppError, AppResult};

/// Append-only audit trail of lifecycle, placement, catalog and org changes.
///
/// Rows carry the action's category so one area's history can be read
/// without scanning the rest.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let action = event.action;
        let entry_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_log_entries (
                category,
                action,
                subject,
                resource_type,
                resource_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(action.category())
        .bind(action.as_str())
        .bind(event.subject.as_str())
        .bind(event.resource_type.as_str())
        .bind(event.resource_id.as_str())
        .bind(event.detail.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            tracing::error!(
                category = action.category(),
                action = action.as_str(),
                resource_type = %event.resource_type,
                resource_id = %event.resource_id,
                error = %error,
                "audit entry was not written"
            );
            AppError::Internal(format!(
                "failed to append {} audit entry for {} '{}': {error}",
                action.as_str(),
                event.resource_type,
                event.resource_id
            ))
        })?;

        tracing::debug!(entry_id, action = action.as_str(), "audit entry written");
        Ok(())
    }
}
