use async_trait::async_trait;
use orgauth_application::{PermissionRepository, RoleRepository};
use orgauth_core::{AppError, AppResult, PermissionId, RoleId};
use orgauth_domain::{PermissionDefinition, Role};

use super::{InMemoryOrganizationStore, OrganizationState};

fn ensure_action_is_free(state: &OrganizationState, permission: &PermissionDefinition) -> AppResult<()> {
    if state
        .permissions
        .values()
        .any(|existing| existing.id() != permission.id() && existing.action() == permission.action())
    {
        return Err(AppError::Conflict(format!(
            "permission '{}' already exists",
            permission.action()
        )));
    }

    Ok(())
}

fn ensure_role_is_valid(state: &OrganizationState, role: &Role) -> AppResult<()> {
    if state
        .roles
        .values()
        .any(|existing| existing.id() != role.id() && existing.name() == role.name())
    {
        return Err(AppError::Conflict(format!(
            "role '{}' already exists",
            role.name()
        )));
    }

    if let Some(unknown) = role
        .permission_ids()
        .iter()
        .find(|permission_id| !state.permissions.contains_key(permission_id))
    {
        return Err(AppError::NotFound(format!(
            "role '{}' references unknown permission '{unknown}'",
            role.name()
        )));
    }

    Ok(())
}

#[async_trait]
impl PermissionRepository for InMemoryOrganizationStore {
    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.state.read().await.permissions.get(&permission_id).cloned())
    }

    async fn find_permission_by_action(
        &self,
        action: &str,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self
            .state
            .read()
            .await
            .permissions
            .values()
            .find(|permission| permission.action() == action)
            .cloned())
    }

    async fn find_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<PermissionDefinition>> {
        let state = self.state.read().await;
        let mut permissions: Vec<PermissionDefinition> = permission_ids
            .iter()
            .filter_map(|permission_id| state.permissions.get(permission_id).cloned())
            .collect();
        permissions.sort_by(|left, right| left.action().cmp(right.action()));
        permissions.dedup_by_key(|permission| permission.id());

        Ok(permissions)
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        let mut permissions: Vec<PermissionDefinition> =
            self.state.read().await.permissions.values().cloned().collect();
        permissions.sort_by(|left, right| left.action().cmp(right.action()));

        Ok(permissions)
    }

    async fn insert_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.permissions.contains_key(&permission.id()) {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.id()
            )));
        }
        ensure_action_is_free(&state, &permission)?;
        state.permissions.insert(permission.id(), permission);

        Ok(())
    }

    async fn save_permission(&self, permission: PermissionDefinition) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.permissions.contains_key(&permission.id()) {
            return Err(AppError::NotFound(format!(
                "permission '{}' was not found",
                permission.id()
            )));
        }
        ensure_action_is_free(&state, &permission)?;
        state.permissions.insert(permission.id(), permission);

        Ok(())
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.permissions.remove(&permission_id).is_none() {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' was not found"
            )));
        }

        for role in state.roles.values_mut() {
            role.revoke(permission_id);
        }

        Ok(())
    }
}

#[async_trait]
impl RoleRepository for InMemoryOrganizationStore {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&role_id).cloned())
    }

    async fn find_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = role_ids
            .iter()
            .filter_map(|role_id| state.roles.get(role_id).cloned())
            .collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));
        roles.dedup_by_key(|role| role.id());

        Ok(roles)
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.state.read().await.roles.values().cloned().collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(roles)
    }

    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.roles.contains_key(&role.id()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.id()
            )));
        }
        ensure_role_is_valid(&state, &role)?;
        state.roles.insert(role.id(), role);

        Ok(())
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&role.id()) {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id()
            )));
        }
        ensure_role_is_valid(&state, &role)?;
        state.roles.insert(role.id(), role);

        Ok(())
    }
}
