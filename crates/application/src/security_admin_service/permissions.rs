use super::*;

use orgauth_core::PermissionId;
use orgauth_domain::{
    ActionType, HierarchyScope, PermissionDefinition, PermissionUpdate, StatusScope, actions,
};

/// Input payload for creating a permission definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePermissionInput {
    /// Action name, e.g. `report.generate`.
    pub action: String,
    /// Authorization tier.
    pub action_type: ActionType,
    /// Hierarchy scope.
    pub hierarchy_scope: HierarchyScope,
    /// Departments the permission applies to; empty follows the configured policy.
    pub status_scope: Vec<DepartmentCode>,
    /// Governed resource type.
    pub resource_type: String,
    /// Whether functional checks skip department alignment.
    pub bypass_hierarchy: bool,
}

impl SecurityAdminService {
    /// Lists permission definitions.
    pub async fn list_permissions(
        &self,
        actor: &ActorIdentity,
    ) -> AppResult<Vec<PermissionDefinition>> {
        self.guard
            .require_permission(actor.employee_id(), actions::PERMISSION_READ)
            .await?;
        self.permissions.list_permissions().await
    }

    /// Creates a custom permission definition.
    pub async fn create_permission(
        &self,
        actor: &ActorIdentity,
        input: CreatePermissionInput,
    ) -> AppResult<PermissionDefinition> {
        self.guard
            .require_permission(actor.employee_id(), actions::SECURITY_ROLE_MANAGE)
            .await?;

        let permission = PermissionDefinition::new(
            PermissionId::new(),
            input.action,
            input.action_type,
            input.hierarchy_scope,
            StatusScope::new(input.status_scope),
            input.resource_type,
        )?
        .with_bypass_hierarchy(input.bypass_hierarchy);
        self.permissions.insert_permission(permission.clone()).await?;

        self.append_audit(
            actor.subject(),
            AuditAction::PermissionCreated,
            "permission",
            permission.id().to_string(),
            format!(
                "created {} permission '{}'",
                permission.action_type().as_str(),
                permission.action()
            ),
        )
        .await?;

        Ok(permission)
    }

    /// Edits a permission definition; system permissions keep their action.
    pub async fn update_permission(
        &self,
        actor: &ActorIdentity,
        permission_id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<PermissionDefinition> {
        self.guard
            .require_permission(actor.employee_id(), actions::SECURITY_ROLE_MANAGE)
            .await?;

        let mut permission = self.require_permission_definition(permission_id).await?;
        permission.apply_update(update)?;
        self.permissions.save_permission(permission.clone()).await?;
        self.guard.aggregator().invalidate_all().await?;

        self.append_audit(
            actor.subject(),
            AuditAction::PermissionUpdated,
            "permission",
            permission_id.to_string(),
            format!("updated permission '{}'", permission.action()),
        )
        .await?;

        Ok(permission)
    }

    /// Deletes a custom permission and its role grants.
    pub async fn delete_permission(
        &self,
        actor: &ActorIdentity,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.guard
            .require_permission(actor.employee_id(), actions::SECURITY_ROLE_MANAGE)
            .await?;

        let permission = self.require_permission_definition(permission_id).await?;
        if permission.is_system() {
            return Err(AppError::Forbidden(format!(
                "system permission '{}' cannot be deleted",
                permission.action()
            )));
        }

        self.permissions.delete_permission(permission_id).await?;
        self.guard.aggregator().invalidate_all().await?;

        self.append_audit(
            actor.subject(),
            AuditAction::PermissionDeleted,
            "permission",
            permission_id.to_string(),
            format!("deleted permission '{}'", permission.action()),
        )
        .await
    }

    async fn require_permission_definition(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<PermissionDefinition> {
        self.permissions
            .find_permission(permission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}' was not found")))
    }
}
