use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use orgauth_application::{GrantUpdate, LifecycleCommit, LifecycleRepository};
use orgauth_core::{AppError, AppResult, EmployeeId};
use orgauth_domain::{EmployeeLifecycle, LifecycleState};

/// PostgreSQL-backed lifecycle repository with optimistic versioning.
///
/// The lifecycle document is stored as JSON next to the columns the sweep
/// queries on; the `version` column is authoritative.
#[derive(Clone)]
pub struct PostgresLifecycleRepository {
    pool: PgPool,
}

impl PostgresLifecycleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LifecycleRow {
    document: Json<EmployeeLifecycle>,
    version: i64,
}

impl TryFrom<LifecycleRow> for EmployeeLifecycle {
    type Error = AppError;

    fn try_from(row: LifecycleRow) -> Result<Self, Self::Error> {
        let version = u64::try_from(row.version).map_err(|error| {
            AppError::Validation(format!("stored lifecycle version is invalid: {error}"))
        })?;
        let lifecycle = row.document.0.with_version(version);
        lifecycle.check_invariants()?;

        Ok(lifecycle)
    }
}

fn rows_into_lifecycles(rows: Vec<LifecycleRow>) -> AppResult<Vec<EmployeeLifecycle>> {
    rows.into_iter().map(EmployeeLifecycle::try_from).collect()
}

#[async_trait]
impl LifecycleRepository for PostgresLifecycleRepository {
    async fn find(&self, employee_id: EmployeeId) -> AppResult<Option<EmployeeLifecycle>> {
        let row = sqlx::query_as::<_, LifecycleRow>(
            "SELECT document, version FROM employee_lifecycles WHERE employee_id = $1",
        )
        .bind(employee_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find lifecycle: {error}")))?;

        row.map(EmployeeLifecycle::try_from).transpose()
    }

    async fn commit(&self, commit: LifecycleCommit) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        for record in &commit.records {
            write_record(&mut transaction, record).await?;
        }

        for update in &commit.grants {
            write_grants(&mut transaction, update).await?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<EmployeeLifecycle>> {
        let rows = sqlx::query_as::<_, LifecycleRow>(
            r#"
            SELECT document, version
            FROM employee_lifecycles
            WHERE due_at IS NOT NULL AND due_at <= $1
            ORDER BY due_at, employee_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list due lifecycles: {error}")))?;

        rows_into_lifecycles(rows)
    }

    async fn list_on_accepted_leave(&self) -> AppResult<Vec<EmployeeLifecycle>> {
        let rows = sqlx::query_as::<_, LifecycleRow>(
            r#"
            SELECT document, version
            FROM employee_lifecycles
            WHERE state = $1
            ORDER BY employee_id
            "#,
        )
        .bind(LifecycleState::OnLeaveAccepted.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list lifecycles on leave: {error}"))
        })?;

        rows_into_lifecycles(rows)
    }
}

async fn write_record(
    transaction: &mut Transaction<'_, Postgres>,
    record: &EmployeeLifecycle,
) -> AppResult<()> {
    let expected = i64::try_from(record.version())
        .map_err(|error| AppError::Validation(format!("lifecycle version out of range: {error}")))?;
    let next = expected + 1;

    let result = if expected == 0 {
        sqlx::query(
            r#"
            INSERT INTO employee_lifecycles (
                employee_id,
                state,
                decision_status,
                document,
                due_at,
                version
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (employee_id) DO NOTHING
            "#,
        )
        .bind(record.employee_id().as_uuid())
        .bind(record.state().as_str())
        .bind(record.decision_status().as_str())
        .bind(Json(record))
        .bind(record.next_due_at())
        .bind(next)
        .execute(&mut **transaction)
        .await
    } else {
        sqlx::query(
            r#"
            UPDATE employee_lifecycles
            SET state = $2,
                decision_status = $3,
                document = $4,
                due_at = $5,
                version = $6,
                updated_at = now()
            WHERE employee_id = $1 AND version = $7
            "#,
        )
        .bind(record.employee_id().as_uuid())
        .bind(record.state().as_str())
        .bind(record.decision_status().as_str())
        .bind(Json(record))
        .bind(record.next_due_at())
        .bind(next)
        .bind(expected)
        .execute(&mut **transaction)
        .await
    }
    .map_err(|error| AppError::Internal(format!("failed to write lifecycle: {error}")))?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "lifecycle of employee '{}' changed concurrently",
            record.employee_id()
        )));
    }

    Ok(())
}

async fn write_grants(
    transaction: &mut Transaction<'_, Postgres>,
    update: &GrantUpdate,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE assignments
        SET role_id = $2,
            permission_overrides = $3
        WHERE id = $1 AND is_active
        "#,
    )
    .bind(update.assignment_id.as_uuid())
    .bind(update.grants.role_id.map(|role_id| role_id.as_uuid()))
    .bind(Json(&update.grants.overrides))
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to write grant state: {error}")))?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "assignment '{}' is no longer active",
            update.assignment_id
        )));
    }

    Ok(())
}
