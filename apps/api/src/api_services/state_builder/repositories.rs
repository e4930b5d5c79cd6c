use std::sync::Arc;

use orgauth_application::{
    AssignmentRepository, AuditRepository, LifecycleRepository, OrgTreeRepository,
    PermissionRepository, RoleRepository,
};
use orgauth_infrastructure::{
    InMemoryOrganizationStore, PostgresAssignmentRepository, PostgresAuditRepository,
    PostgresCatalogRepository, PostgresLifecycleRepository, PostgresOrgTreeRepository,
};
use sqlx::PgPool;

/// Every store port the services are wired against.
pub struct RepositorySet {
    pub org_tree: Arc<dyn OrgTreeRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub lifecycles: Arc<dyn LifecycleRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl RepositorySet {
    pub fn postgres(pool: &PgPool) -> Self {
        let catalog = Arc::new(PostgresCatalogRepository::new(pool.clone()));

        Self {
            org_tree: Arc::new(PostgresOrgTreeRepository::new(pool.clone())),
            assignments: Arc::new(PostgresAssignmentRepository::new(pool.clone())),
            permissions: catalog.clone(),
            roles: catalog,
            lifecycles: Arc::new(PostgresLifecycleRepository::new(pool.clone())),
            audit: Arc::new(PostgresAuditRepository::new(pool.clone())),
        }
    }

    /// One store behind every port so lifecycle commits stay atomic.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryOrganizationStore::new());

        Self {
            org_tree: store.clone(),
            assignments: store.clone(),
            permissions: store.clone(),
            roles: store.clone(),
            lifecycles: store.clone(),
            audit: store,
        }
    }
}
