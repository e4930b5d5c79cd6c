use super::*;

use orgauth_core::{PermissionId, RoleId};
use orgauth_domain::{
    ActionType, HierarchyScope, PermissionDefinition, Role, StatusScope, actions,
};

use crate::PlaceEmployeeInput;

const BOOTSTRAP_SUBJECT: &str = "system:bootstrap";

/// Input payload for seeding an empty organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapInput {
    /// Name of the root node, e.g. `CHAIRMAN`.
    pub root_name: String,
    /// Employee placed at the root.
    pub chairman_id: EmployeeId,
    /// Name of the organization-wide role.
    pub role_name: String,
}

/// Records created by [`SecurityAdminService::bootstrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// Root node.
    pub root: OrgNode,
    /// Role holding every system permission.
    pub role: Role,
    /// Chairman placement.
    pub assignment: Assignment,
    /// System permissions present after seeding.
    pub permissions: Vec<PermissionDefinition>,
}

/// Returns the system permission catalog the engine's own use-cases check.
pub fn system_permissions() -> AppResult<Vec<PermissionDefinition>> {
    let catalog = [
        (actions::LEAVE_APPLY, ActionType::Functional, HierarchyScope::OwnRecord, "leave"),
        (actions::LEAVE_APPROVE, ActionType::Administrative, HierarchyScope::Descendant, "leave"),
        (actions::EMPLOYEE_SUSPEND, ActionType::Administrative, HierarchyScope::Descendant, "employee"),
        (actions::EMPLOYEE_BLOCK, ActionType::Administrative, HierarchyScope::Descendant, "employee"),
        (actions::EMPLOYEE_TERMINATE, ActionType::Administrative, HierarchyScope::Descendant, "employee"),
        (actions::EMPLOYEE_RESTORE, ActionType::Administrative, HierarchyScope::Descendant, "employee"),
        (actions::EMPLOYEE_PLACE, ActionType::Administrative, HierarchyScope::Descendant, "assignment"),
        (actions::PERMISSION_READ, ActionType::Informational, HierarchyScope::Organization, "permission"),
        (actions::SECURITY_ROLE_MANAGE, ActionType::Administrative, HierarchyScope::Descendant, "role"),
        (actions::ORG_STRUCTURE_MANAGE, ActionType::Administrative, HierarchyScope::Organization, "org_node"),
    ];

    catalog
        .into_iter()
        .map(|(action, action_type, hierarchy_scope, resource_type)| {
            PermissionDefinition::new(
                PermissionId::new(),
                action,
                action_type,
                hierarchy_scope,
                StatusScope::everywhere(),
                resource_type,
            )
            .map(PermissionDefinition::into_system)
        })
        .collect()
}

impl SecurityAdminService {
    /// Seeds an empty organization with its root, the system permissions and
    /// an organization-wide chairman.
    pub async fn bootstrap(&self, input: BootstrapInput) -> AppResult<BootstrapOutcome> {
        if let Some(root) = self.org_tree.root().await? {
            return Err(AppError::Conflict(format!(
                "organization is already bootstrapped at '{}'",
                root.path()
            )));
        }

        let mut permissions = Vec::new();
        for permission in system_permissions()? {
            match self
                .permissions
                .find_permission_by_action(permission.action())
                .await?
            {
                Some(existing) => permissions.push(existing),
                None => {
                    self.permissions.insert_permission(permission.clone()).await?;
                    permissions.push(permission);
                }
            }
        }

        let root = self
            .org_tree
            .create_node(None, input.root_name.as_str(), DepartmentCode::All)
            .await?;

        let role = Role::new(
            RoleId::new(),
            input.role_name,
            "executive",
            permissions.iter().map(PermissionDefinition::id),
        )?;
        self.roles.insert_role(role.clone()).await?;

        let (assignment, _) = self
            .assignment_service
            .create_or_replace(PlaceEmployeeInput {
                employee_id: input.chairman_id,
                role_id: role.id(),
                org_node_id: root.id(),
                department: DepartmentCode::All,
                overrides: Vec::new(),
            })
            .await?;
        self.guard.aggregator().invalidate_all().await?;
        tracing::info!(root = %root.path(), chairman_id = %input.chairman_id, "organization bootstrapped");

        self.append_audit(
            BOOTSTRAP_SUBJECT.to_owned(),
            AuditAction::OrgNodeCreated,
            "org_node",
            root.id().to_string(),
            format!("bootstrapped '{}' with chairman '{}'", root.path(), input.chairman_id),
        )
        .await?;

        Ok(BootstrapOutcome {
            root,
            role,
            assignment,
            permissions,
        })
    }
}
