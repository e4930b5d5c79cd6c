use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use orgauth_application::{AssignmentListQuery, AssignmentRepository};
use orgauth_core::{AppError, AppResult, AssignmentId, EmployeeId, OrgNodeId, RoleId};
use orgauth_domain::{Assignment, DepartmentCode, GrantState, PermissionOverride};

/// PostgreSQL-backed assignment repository.
///
/// The single-active-assignment rule is enforced by a partial unique index.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: uuid::Uuid,
    employee_id: uuid::Uuid,
    org_node_id: uuid::Uuid,
    department: String,
    role_id: Option<uuid::Uuid>,
    permission_overrides: Json<Vec<PermissionOverride>>,
    is_active: bool,
    effective_from: DateTime<Utc>,
    effective_until: Option<DateTime<Utc>>,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Assignment::from_parts(
            AssignmentId::from_uuid(row.id),
            EmployeeId::from_uuid(row.employee_id),
            OrgNodeId::from_uuid(row.org_node_id),
            DepartmentCode::from_str(row.department.as_str())?,
            GrantState::new(row.role_id.map(RoleId::from_uuid), row.permission_overrides.0),
            row.is_active,
            row.effective_from,
            row.effective_until,
        )
    }
}

const ASSIGNMENT_COLUMNS: &str = "id, employee_id, org_node_id, department, role_id, \
    permission_overrides, is_active, effective_from, effective_until";

fn rows_into_assignments(rows: Vec<AssignmentRow>) -> AppResult<Vec<Assignment>> {
    rows.into_iter().map(Assignment::try_from).collect()
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn find_active(&self, employee_id: EmployeeId) -> AppResult<Option<Assignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE employee_id = $1 AND is_active"
        ))
        .bind(employee_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find active assignment: {error}"))
        })?;

        row.map(Assignment::try_from).transpose()
    }

    async fn list_active_at_nodes(&self, node_ids: &[OrgNodeId]) -> AppResult<Vec<Assignment>> {
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }

        let node_ids: Vec<uuid::Uuid> = node_ids.iter().map(OrgNodeId::as_uuid).collect();
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE is_active AND org_node_id = ANY($1)"
        ))
        .bind(node_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list assignments at nodes: {error}"))
        })?;

        rows_into_assignments(rows)
    }

    async fn list_active(&self, query: AssignmentListQuery) -> AppResult<Vec<Assignment>> {
        let limit = i64::try_from(query.limit)
            .map_err(|error| AppError::Validation(format!("invalid limit: {error}")))?;
        let offset = i64::try_from(query.offset)
            .map_err(|error| AppError::Validation(format!("invalid offset: {error}")))?;

        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM assignments
            WHERE is_active
              AND ($1::TEXT IS NULL OR department = $1)
              AND ($2::UUID IS NULL OR org_node_id = $2)
            ORDER BY effective_from, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(query.department.map(|department| department.as_str()))
        .bind(query.org_node_id.map(|node_id| node_id.as_uuid()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        rows_into_assignments(rows)
    }

    async fn replace_active(&self, assignment: Assignment) -> AppResult<Option<Assignment>> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let previous = sqlx::query_as::<_, AssignmentRow>(&format!(
            r#"
            UPDATE assignments
            SET is_active = FALSE,
                effective_until = GREATEST($2, effective_from)
            WHERE employee_id = $1 AND is_active
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(assignment.employee_id().as_uuid())
        .bind(assignment.effective_from())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate previous assignment: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO assignments (
                id,
                employee_id,
                org_node_id,
                department,
                role_id,
                permission_overrides,
                is_active,
                effective_from,
                effective_until
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(assignment.id().as_uuid())
        .bind(assignment.employee_id().as_uuid())
        .bind(assignment.org_node_id().as_uuid())
        .bind(assignment.department().as_str())
        .bind(assignment.role_id().map(|role_id| role_id.as_uuid()))
        .bind(Json(assignment.permission_overrides().to_vec()))
        .bind(assignment.is_active())
        .bind(assignment.effective_from())
        .bind(assignment.effective_until())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_assignment_conflict(error, assignment.employee_id()))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        previous.map(Assignment::try_from).transpose()
    }

    async fn deactivate(&self, assignment_id: AssignmentId, at: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET is_active = FALSE,
                effective_until = GREATEST($2, effective_from)
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to deactivate assignment: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "active assignment '{assignment_id}' was not found"
            )));
        }

        Ok(())
    }

    async fn update_grants(&self, assignment_id: AssignmentId, grants: GrantState) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET role_id = $2,
                permission_overrides = $3
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(grants.role_id.map(|role_id| role_id.as_uuid()))
        .bind(Json(grants.overrides))
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update grants: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "assignment '{assignment_id}' is no longer active"
            )));
        }

        Ok(())
    }
}

fn map_assignment_conflict(error: sqlx::Error, employee_id: EmployeeId) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!(
            "employee '{employee_id}' was placed concurrently"
        ));
    }

    AppError::Internal(format!("failed to insert assignment: {error}"))
}
