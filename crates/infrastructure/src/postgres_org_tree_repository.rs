use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use orgauth_application::OrgTreeRepository;
use orgauth_core::{AppError, AppResult, OrgNodeId};
use orgauth_domain::{DepartmentCode, OrgNode, OrgPath, OrgTree};

/// PostgreSQL-backed org tree repository using materialized paths.
#[derive(Clone)]
pub struct PostgresOrgTreeRepository {
    pool: PgPool,
}

impl PostgresOrgTreeRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrgNodeRow {
    id: uuid::Uuid,
    name: String,
    level: i32,
    department: String,
    path: String,
    parent_id: Option<uuid::Uuid>,
    is_active: bool,
}

impl TryFrom<OrgNodeRow> for OrgNode {
    type Error = AppError;

    fn try_from(row: OrgNodeRow) -> Result<Self, Self::Error> {
        let level = u32::try_from(row.level).map_err(|error| {
            AppError::Validation(format!("org node '{}' has invalid level: {error}", row.id))
        })?;

        OrgNode::from_parts(
            OrgNodeId::from_uuid(row.id),
            row.name.as_str(),
            level,
            DepartmentCode::from_str(row.department.as_str())?,
            OrgPath::parse(row.path)?,
            row.parent_id.map(OrgNodeId::from_uuid),
            row.is_active,
        )
    }
}

const NODE_COLUMNS: &str = "id, name, level, department, path, parent_id, is_active";

#[async_trait]
impl OrgTreeRepository for PostgresOrgTreeRepository {
    async fn find_node(&self, node_id: OrgNodeId) -> AppResult<Option<OrgNode>> {
        let row = sqlx::query_as::<_, OrgNodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM org_nodes WHERE id = $1"
        ))
        .bind(node_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find org node: {error}")))?;

        row.map(OrgNode::try_from).transpose()
    }

    async fn list_descendants(&self, path: &OrgPath) -> AppResult<Vec<OrgNode>> {
        let rows = sqlx::query_as::<_, OrgNodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM org_nodes WHERE starts_with(path, $1) ORDER BY path"
        ))
        .bind(path.descendant_prefix())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list descendants: {error}")))?;

        rows.into_iter().map(OrgNode::try_from).collect()
    }

    async fn load_tree(&self) -> AppResult<OrgTree> {
        let rows = sqlx::query_as::<_, OrgNodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM org_nodes ORDER BY level, path"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load org tree: {error}")))?;

        let nodes = rows
            .into_iter()
            .map(OrgNode::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        OrgTree::from_nodes(nodes)
    }

    async fn insert_node(&self, node: OrgNode) -> AppResult<()> {
        let level = i32::try_from(node.level())
            .map_err(|error| AppError::Validation(format!("org node level out of range: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO org_nodes (id, name, level, department, path, parent_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(node.id().as_uuid())
        .bind(node.name())
        .bind(level)
        .bind(node.department().as_str())
        .bind(node.path().as_str())
        .bind(node.parent_id().map(|id| id.as_uuid()))
        .bind(node.is_active())
        .execute(&self.pool)
        .await
        .map_err(|error| map_node_conflict(error, node.path()))?;

        Ok(())
    }

    async fn save_nodes(&self, nodes: Vec<OrgNode>) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        for node in &nodes {
            let level = i32::try_from(node.level()).map_err(|error| {
                AppError::Validation(format!("org node level out of range: {error}"))
            })?;

            let result = sqlx::query(
                r#"
                UPDATE org_nodes
                SET level = $2,
                    path = $3,
                    parent_id = $4,
                    is_active = $5,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(node.id().as_uuid())
            .bind(level)
            .bind(node.path().as_str())
            .bind(node.parent_id().map(|id| id.as_uuid()))
            .bind(node.is_active())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_node_conflict(error, node.path()))?;

            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!(
                    "org node '{}' was not found",
                    node.id()
                )));
            }
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }
}

fn map_node_conflict(error: sqlx::Error, path: &OrgPath) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!(
            "org path '{path}' already exists or a root is already present"
        ));
    }

    AppError::Internal(format!("failed to write org node '{path}': {error}"))
}
