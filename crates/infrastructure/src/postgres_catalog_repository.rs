use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use orgauth_application::{PermissionRepository, RoleRepository};
use orgauth_core::{AppError, AppResult, PermissionId, RoleId};
use orgauth_domain::{
    ActionType, DepartmentCode, HierarchyScope, PermissionDefinition, Role, StatusScope,
};

/// PostgreSQL-backed permission catalog and role repository.
#[derive(Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    action: String,
    action_type: String,
    hierarchy_scope: String,
    status_scope: Vec<String>,
    resource_type: String,
    is_system: bool,
    bypass_hierarchy: bool,
}

impl TryFrom<PermissionRow> for PermissionDefinition {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let departments = row
            .status_scope
            .iter()
            .map(|value| DepartmentCode::from_str(value))
            .collect::<AppResult<Vec<_>>>()?;

        let permission = PermissionDefinition::new(
            PermissionId::from_uuid(row.id),
            row.action,
            ActionType::from_str(row.action_type.as_str())?,
            HierarchyScope::from_str(row.hierarchy_scope.as_str())?,
            StatusScope::new(departments),
            row.resource_type,
        )?
        .with_bypass_hierarchy(row.bypass_hierarchy);

        Ok(if row.is_system {
            permission.into_system()
        } else {
            permission
        })
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    category: String,
    permission_ids: Vec<uuid::Uuid>,
}

impl TryFrom<RoleRow> for Role {
    type Error = AppError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Role::new(
            RoleId::from_uuid(row.id),
            row.name,
            row.category,
            row.permission_ids.into_iter().map(PermissionId::from_uuid),
        )
    }
}

const PERMISSION_COLUMNS: &str = "id, action, action_type, hierarchy_scope, status_scope, \
    resource_type, is_system, bypass_hierarchy";

const ROLE_SELECT: &str = r#"
    SELECT
        roles.id,
        roles.name,
        roles.category,
        COALESCE(
            array_agg(role_permissions.permission_id ORDER BY role_permissions.permission_id)
                FILTER (WHERE role_permissions.permission_id IS NOT NULL),
            '{}'
        ) AS permission_ids
    FROM roles
    LEFT JOIN role_permissions ON role_permissions.role_id = roles.id
"#;

fn status_scope_values(permission: &PermissionDefinition) -> Vec<String> {
    permission
        .status_scope()
        .departments()
        .map(|department| department.as_str().to_owned())
        .collect()
}

#[async_trait]
impl PermissionRepository for PostgresCatalogRepository {
    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permission_definitions WHERE id = $1"
        ))
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find permission: {error}")))?;

        row.map(PermissionDefinition::try_from).transpose()
    }

    async fn find_permission_by_action(
        &self,
        action: &str,
    ) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permission_definitions WHERE action = $1"
        ))
        .bind(action)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find permission by action: {error}"))
        })?;

        row.map(PermissionDefinition::try_from).transpose()
    }

    async fn find_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<PermissionDefinition>> {
        if permission_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<uuid::Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permission_definitions WHERE id = ANY($1) ORDER BY action"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permissions: {error}")))?;

        rows.into_iter().map(PermissionDefinition::try_from).collect()
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permission_definitions ORDER BY action"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(PermissionDefinition::try_from).collect()
    }

    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_definitions (
                id,
                action,
                action_type,
                hierarchy_scope,
                status_scope,
                resource_type,
                is_system,
                bypass_hierarchy
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(permission.action())
        .bind(permission.action_type().as_str())
        .bind(permission.hierarchy_scope().as_str())
        .bind(status_scope_values(&permission))
        .bind(permission.resource_type())
        .bind(permission.is_system())
        .bind(permission.bypass_hierarchy())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(error, format!("permission '{}' already exists", permission.action()))
        })?;

        Ok(())
    }

    async fn save_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE permission_definitions
            SET action = $2,
                action_type = $3,
                hierarchy_scope = $4,
                status_scope = $5,
                resource_type = $6,
                bypass_hierarchy = $7,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(permission.action())
        .bind(permission.action_type().as_str())
        .bind(permission.hierarchy_scope().as_str())
        .bind(status_scope_values(&permission))
        .bind(permission.resource_type())
        .bind(permission.bypass_hierarchy())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(error, format!("permission '{}' already exists", permission.action()))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{}' was not found",
                permission.id()
            )));
        }

        Ok(())
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM permission_definitions WHERE id = $1")
            .bind(permission_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete permission: {error}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RoleRepository for PostgresCatalogRepository {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} WHERE roles.id = $1 GROUP BY roles.id"
        ))
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        row.map(Role::try_from).transpose()
    }

    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<uuid::Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} WHERE roles.id = ANY($1) GROUP BY roles.id ORDER BY roles.name"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} GROUP BY roles.id ORDER BY roles.name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query("INSERT INTO roles (id, name, category) VALUES ($1, $2, $3)")
            .bind(role.id().as_uuid())
            .bind(role.name())
            .bind(role.category())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_unique_violation(error, format!("role '{}' already exists", role.name()))
            })?;

        insert_role_permissions(&mut transaction, &role).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let result = sqlx::query(
            "UPDATE roles SET name = $2, category = $3, updated_at = now() WHERE id = $1",
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.category())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_unique_violation(error, format!("role '{}' already exists", role.name()))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id()
            )));
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role permissions: {error}"))
            })?;

        insert_role_permissions(&mut transaction, &role).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }
}

async fn insert_role_permissions(
    transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    role: &Role,
) -> AppResult<()> {
    let permission_ids: Vec<uuid::Uuid> =
        role.permission_ids().iter().map(PermissionId::as_uuid).collect();
    if permission_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO role_permissions (role_id, permission_id)
        SELECT $1, permission_id
        FROM UNNEST($2::UUID[]) AS permission_id
        "#,
    )
    .bind(role.id().as_uuid())
    .bind(permission_ids)
    .execute(&mut **transaction)
    .await
    .map_err(|error| {
        if let sqlx::Error::Database(database_error) = &error
            && database_error.code().as_deref() == Some("23503")
        {
            return AppError::NotFound(format!(
                "role '{}' references an unknown permission",
                role.name()
            ));
        }

        AppError::Internal(format!("failed to write role permissions: {error}"))
    })?;

    Ok(())
}

fn map_unique_violation(error: sqlx::Error, conflict_message: String) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(conflict_message);
    }

    AppError::Internal(format!("catalog write failed: {error}"))
}
