use orgauth_application::{
    DepartmentGuard, HierarchyGuard, LifecycleService, OrgTreeService, SecurityAdminService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub hierarchy_guard: HierarchyGuard,
    pub department_guard: DepartmentGuard,
    pub org_tree_service: OrgTreeService,
    pub security_admin_service: SecurityAdminService,
    pub lifecycle_service: LifecycleService,
}
