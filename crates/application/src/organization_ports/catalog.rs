use async_trait::async_trait;
use orgauth_core::{AppResult, PermissionId, RoleId};
use orgauth_domain::{PermissionDefinition, Role};

/// Repository port for permission definitions.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Finds one permission.
    async fn find_permission(&self, permission_id: PermissionId)
    -> AppResult<Option<PermissionDefinition>>;

    /// Finds the permission with the given action name.
    async fn find_permission_by_action(
        &self,
        action: &str,
    ) -> AppResult<Option<PermissionDefinition>>;

    /// Loads the permissions that exist among `permission_ids`; unknown ids are skipped.
    async fn find_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<PermissionDefinition>>;

    /// Lists every permission ordered by action.
    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>>;

    /// Inserts a permission; duplicate actions are conflicts.
    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()>;

    /// Overwrites an existing permission.
    async fn save_permission(&self, permission: PermissionDefinition) -> AppResult<()>;

    /// Deletes a permission and every role grant of it.
    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()>;
}

/// Repository port for roles.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds one role.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Loads the roles that exist among `role_ids`.
    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>>;

    /// Lists every role ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Inserts a role; duplicate names are conflicts.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Overwrites an existing role and its permission set.
    async fn save_role(&self, role: Role) -> AppResult<()>;
}
