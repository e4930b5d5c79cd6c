use std::sync::Arc;

use orgauth_core::{
    ActorIdentity, AppError, AppResult, EmployeeId, OrgNodeId, PermissionId, RoleId,
};
use orgauth_domain::{
    Assignment, AuditAction, DepartmentCode, LifecycleState, OrgNode, PermissionOverride,
    ReasonCode,
};

use crate::{
    AssignmentService, AuditEvent, AuditRepository, DepartmentGuard, HierarchyGuard,
    LifecycleRepository, OrgTreeService, PermissionRepository, RoleRepository,
};

mod bootstrap;
mod org_structure;
mod permissions;
mod placement;
mod roles;

pub use bootstrap::{BootstrapInput, BootstrapOutcome, system_permissions};
pub use org_structure::CreateOrgNodeInput;
pub use permissions::CreatePermissionInput;
pub use roles::CreateRoleInput;

/// Application service for permission, role, placement and org structure
/// administration.
#[derive(Clone)]
pub struct SecurityAdminService {
    guard: HierarchyGuard,
    department_guard: DepartmentGuard,
    assignment_service: AssignmentService,
    org_tree: OrgTreeService,
    permissions: Arc<dyn PermissionRepository>,
    roles: Arc<dyn RoleRepository>,
    lifecycles: Arc<dyn LifecycleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

/// Collaborators of [`SecurityAdminService`].
#[derive(Clone)]
pub struct SecurityAdminDependencies {
    /// Hierarchy guard, also carrying the aggregator for cache invalidation.
    pub guard: HierarchyGuard,
    /// Department isolation guard for listings.
    pub department_guard: DepartmentGuard,
    /// Placement service.
    pub assignment_service: AssignmentService,
    /// Org tree service.
    pub org_tree: OrgTreeService,
    /// Permission store.
    pub permissions: Arc<dyn PermissionRepository>,
    /// Role store.
    pub roles: Arc<dyn RoleRepository>,
    /// Lifecycle store.
    pub lifecycles: Arc<dyn LifecycleRepository>,
    /// Audit sink.
    pub audit_repository: Arc<dyn AuditRepository>,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(dependencies: SecurityAdminDependencies) -> Self {
        Self {
            guard: dependencies.guard,
            department_guard: dependencies.department_guard,
            assignment_service: dependencies.assignment_service,
            org_tree: dependencies.org_tree,
            permissions: dependencies.permissions,
            roles: dependencies.roles,
            lifecycles: dependencies.lifecycles,
            audit_repository: dependencies.audit_repository,
        }
    }

    async fn actor_placement(&self, actor: &ActorIdentity) -> AppResult<(Assignment, OrgNode)> {
        let assignment = self
            .assignment_service
            .active_assignment(actor.employee_id())
            .await?
            .ok_or_else(|| {
                AppError::Forbidden(format!(
                    "{}: actor '{}' has no active assignment",
                    ReasonCode::NoAssignment.as_str(),
                    actor.employee_id()
                ))
            })?;
        let node = self
            .org_tree
            .node(assignment.org_node_id())
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "{}: actor '{}' is placed at missing org node '{}'",
                    ReasonCode::NoOrgunit.as_str(),
                    actor.employee_id(),
                    assignment.org_node_id()
                ))
            })?;

        Ok((assignment, node))
    }

    /// Ensures `node_id` lies in the actor's subtree and department.
    async fn ensure_within_reach(
        &self,
        actor: &ActorIdentity,
        node_id: OrgNodeId,
        department: Option<DepartmentCode>,
    ) -> AppResult<OrgNode> {
        let (actor_assignment, actor_node) = self.actor_placement(actor).await?;
        let node = self.org_tree.require_node(node_id).await?;

        if !actor_node.path().contains(node.path()) {
            return Err(AppError::Forbidden(format!(
                "{}: '{}' is outside the subtree of '{}'",
                ReasonCode::SubtreeViolation.as_str(),
                node.path(),
                actor_node.path()
            )));
        }

        let actor_department = actor_assignment.department();
        let requested = department.unwrap_or(node.department());
        if !actor_department.is_wildcard() && actor_department != requested {
            return Err(AppError::Forbidden(format!(
                "{}: {} staff cannot manage {}",
                ReasonCode::DepartmentViolation.as_str(),
                actor_department.as_str(),
                requested.as_str()
            )));
        }

        Ok(node)
    }

    /// Ensures the actor already holds every permission a role and overrides
    /// would grant. A bypass override needs bypass on the actor's side too.
    async fn ensure_grantable(
        &self,
        actor: &ActorIdentity,
        role_id: Option<RoleId>,
        overrides: &[PermissionOverride],
    ) -> AppResult<()> {
        let held = self
            .guard
            .aggregator()
            .effective_permissions(actor.employee_id())
            .await?;

        let mut granted: Vec<(PermissionId, bool)> = overrides
            .iter()
            .map(|value| (value.permission_id, value.bypass_hierarchy))
            .collect();
        if let Some(role_id) = role_id {
            let role = self
                .roles
                .find_roles(&[role_id])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
            granted.extend(role.permission_ids().iter().map(|id| (*id, false)));
        }

        for (permission_id, bypass) in granted {
            let Some(permission) = held
                .effective
                .iter()
                .find(|permission| permission.id() == permission_id)
            else {
                return Err(AppError::Forbidden(format!(
                    "{}: actor '{}' cannot grant permission '{permission_id}' they do not hold",
                    ReasonCode::NoPermission.as_str(),
                    actor.employee_id()
                )));
            };

            let actor_bypasses = permission.bypass_hierarchy()
                || held
                    .override_for(permission_id)
                    .is_some_and(|value| value.bypass_hierarchy);
            if bypass && !actor_bypasses {
                return Err(AppError::Forbidden(format!(
                    "{}: actor '{}' cannot grant bypass on '{}' without holding it",
                    ReasonCode::NoPermission.as_str(),
                    actor.employee_id(),
                    permission.action()
                )));
            }
        }

        Ok(())
    }

    /// Refuses placement edits while a reversible transition is in flight.
    async fn ensure_settled(&self, employee_id: EmployeeId) -> AppResult<()> {
        let Some(lifecycle) = self.lifecycles.find(employee_id).await? else {
            return Ok(());
        };

        if lifecycle.state() != LifecycleState::Normal {
            return Err(AppError::InvalidTransition(format!(
                "employee '{employee_id}' is {}; restore them before changing their placement",
                lifecycle.state().as_str()
            )));
        }

        if let Some(hold) = lifecycle.delegation_hold() {
            return Err(AppError::InvalidTransition(format!(
                "employee '{employee_id}' holds delegated authority for '{}'",
                hold.leave_taker_id
            )));
        }

        Ok(())
    }

    async fn append_audit(
        &self,
        subject: String,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                subject,
                action,
                resource_type: resource_type.to_owned(),
                resource_id,
                detail: Some(detail),
            })
            .await
    }
}
