//! Application services and ports.

#![forbid(unsafe_code)]

mod assignment_service;
mod department_guard;
mod hierarchy_guard;
mod lifecycle_service;
mod org_tree_service;
mod organization_ports;
mod permission_aggregator;
mod security_admin_service;
mod status_sweep_service;

#[cfg(test)]
mod test_support;

pub use assignment_service::{AssignmentService, PlaceEmployeeInput};
pub use department_guard::{DepartmentEvaluation, DepartmentGuard, narrow_query};
pub use hierarchy_guard::HierarchyGuard;
pub use lifecycle_service::{ApplyLeaveInput, LifecycleService, RestrictionInput};
pub use org_tree_service::OrgTreeService;
pub use organization_ports::{
    AssignmentListQuery, AssignmentRepository, AuditEvent, AuditRepository, GrantUpdate,
    LifecycleCommit, LifecycleRepository, Notification, NotificationKind, NotificationSender,
    OrgTreeRepository, PermissionCache, PermissionRepository, RoleRepository,
};
pub use permission_aggregator::{AuthorizationPolicy, EffectivePermissions, PermissionAggregator};
pub use security_admin_service::{
    BootstrapInput, BootstrapOutcome, CreateOrgNodeInput, CreatePermissionInput, CreateRoleInput,
    SecurityAdminDependencies, SecurityAdminService, system_permissions,
};
pub use status_sweep_service::{StatusSweepService, SweepReport};
