//! Shared helpers for tests that run against `DATABASE_URL`.

use orgauth_application::OrgTreeRepository;
use orgauth_domain::{DepartmentCode, OrgNode};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::PostgresOrgTreeRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Returns a migrated pool, or `None` when no database is configured.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres tests: {error}");
    }

    Some(pool)
}

/// Returns a fresh branch below the shared root so tests never collide.
pub(crate) async fn isolated_branch(pool: &PgPool, department: DepartmentCode) -> OrgNode {
    let repository = PostgresOrgTreeRepository::new(pool.clone());
    let tree = match repository.load_tree().await {
        Ok(tree) => tree,
        Err(error) => panic!("failed to load org tree: {error}"),
    };

    let root = match tree.root() {
        Some(root) => root.clone(),
        None => {
            let root = OrgNode::root("ROOT", DepartmentCode::All)
                .unwrap_or_else(|_| unreachable!());
            match repository.insert_node(root.clone()).await {
                Ok(()) => root,
                // Another test created the root first.
                Err(_) => repository
                    .load_tree()
                    .await
                    .ok()
                    .and_then(|tree| tree.root().cloned())
                    .unwrap_or_else(|| panic!("org tree has no root")),
            }
        }
    };

    let name = format!("T{}", uuid::Uuid::new_v4().simple()).to_uppercase();
    let branch = OrgNode::child_of(&root, name.as_str(), department)
        .unwrap_or_else(|_| unreachable!());
    if let Err(error) = repository.insert_node(branch.clone()).await {
        panic!("failed to insert test branch: {error}");
    }

    branch
}
