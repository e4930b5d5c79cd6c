use super::*;

use orgauth_core::{PermissionId, RoleId};
use orgauth_domain::{Role, actions};

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Role category, e.g. `management`.
    pub category: String,
    /// Permissions bundled into the role.
    pub permission_ids: Vec<PermissionId>,
}

impl SecurityAdminService {
    /// Lists roles.
    pub async fn list_roles(&self, actor: &ActorIdentity) -> AppResult<Vec<Role>> {
        self.guard
            .require_permission(actor.employee_id(), actions::PERMISSION_READ)
            .await?;
        self.roles.list_roles().await
    }

    /// Creates a role and emits an audit event.
    pub async fn create_role(&self, actor: &ActorIdentity, input: CreateRoleInput) -> AppResult<Role> {
        self.guard
            .require_permission(actor.employee_id(), actions::SECURITY_ROLE_MANAGE)
            .await?;

        let found = self.permissions.find_permissions(&input.permission_ids).await?;
        if let Some(missing) = input
            .permission_ids
            .iter()
            .find(|id| !found.iter().any(|permission| permission.id() == **id))
        {
            return Err(AppError::NotFound(format!(
                "permission '{missing}' was not found"
            )));
        }

        let role = Role::new(RoleId::new(), input.name, input.category, input.permission_ids)?;
        self.roles.insert_role(role.clone()).await?;

        self.append_audit(
            actor.subject(),
            AuditAction::RoleCreated,
            "role",
            role.id().to_string(),
            format!("created role '{}'", role.name()),
        )
        .await?;

        Ok(role)
    }

    /// Adds a permission to a role. Every holder and their superiors gain it.
    pub async fn grant_permission_to_role(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<Role> {
        self.guard
            .require_permission(actor.employee_id(), actions::SECURITY_ROLE_MANAGE)
            .await?;

        if self.permissions.find_permission(permission_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        }

        let mut role = self.require_role(role_id).await?;
        if role.grant(permission_id) {
            self.roles.save_role(role.clone()).await?;
            self.guard.aggregator().invalidate_all().await?;
            self.append_audit(
                actor.subject(),
                AuditAction::RolePermissionGranted,
                "role",
                role_id.to_string(),
                format!("granted '{permission_id}' to role '{}'", role.name()),
            )
            .await?;
        }

        Ok(role)
    }

    /// Removes a permission from a role.
    pub async fn revoke_permission_from_role(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<Role> {
        self.guard
            .require_permission(actor.employee_id(), actions::SECURITY_ROLE_MANAGE)
            .await?;

        let mut role = self.require_role(role_id).await?;
        if role.revoke(permission_id) {
            self.roles.save_role(role.clone()).await?;
            self.guard.aggregator().invalidate_all().await?;
            self.append_audit(
                actor.subject(),
                AuditAction::RolePermissionRevoked,
                "role",
                role_id.to_string(),
                format!("revoked '{permission_id}' from role '{}'", role.name()),
            )
            .await?;
        }

        Ok(role)
    }

    async fn require_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.roles
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }
}
