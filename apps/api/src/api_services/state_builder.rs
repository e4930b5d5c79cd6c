use orgauth_application::{
    AssignmentService, AuthorizationPolicy, DepartmentGuard, HierarchyGuard, LifecycleService,
    OrgTreeService, PermissionAggregator, SecurityAdminDependencies, SecurityAdminService,
};
use orgauth_core::AppError;

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::redis::build_redis_client;

mod caches;
mod notifications;
mod repositories;

pub use repositories::RepositorySet;

pub fn build_app_state(repositories: RepositorySet, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = config
        .redis_url
        .as_deref()
        .map(build_redis_client)
        .transpose()?;

    let mut aggregator = PermissionAggregator::new(
        repositories.org_tree.clone(),
        repositories.assignments.clone(),
        repositories.roles.clone(),
        repositories.permissions.clone(),
        AuthorizationPolicy {
            empty_status_scope: config.empty_status_scope_policy,
        },
    );
    if let Some(cache) = caches::build_permission_cache(config, redis_client) {
        aggregator = aggregator.with_cache(cache);
    }

    let hierarchy_guard = HierarchyGuard::new(
        aggregator,
        repositories.assignments.clone(),
        repositories.org_tree.clone(),
    );
    let department_guard = DepartmentGuard::new(repositories.assignments.clone());
    let org_tree_service = OrgTreeService::new(repositories.org_tree.clone());

    let security_admin_service = SecurityAdminService::new(SecurityAdminDependencies {
        guard: hierarchy_guard.clone(),
        department_guard: department_guard.clone(),
        assignment_service: AssignmentService::new(
            repositories.assignments.clone(),
            repositories.org_tree.clone(),
            repositories.roles.clone(),
            repositories.permissions.clone(),
        ),
        org_tree: org_tree_service.clone(),
        permissions: repositories.permissions.clone(),
        roles: repositories.roles.clone(),
        lifecycles: repositories.lifecycles.clone(),
        audit_repository: repositories.audit.clone(),
    });

    let lifecycle_service = LifecycleService::new(
        hierarchy_guard.clone(),
        repositories.lifecycles,
        repositories.assignments,
        repositories.roles,
        repositories.audit,
        notifications::build_notification_sender(config),
    );

    Ok(AppState {
        hierarchy_guard,
        department_guard,
        org_tree_service,
        security_admin_service,
        lifecycle_service,
    })
}
