use std::collections::BTreeSet;

use orgauth_core::{AppResult, NonEmptyString, PermissionId, RoleId};
use serde::{Deserialize, Serialize};

/// Named permission bundle shared by many employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    category: NonEmptyString,
    permission_ids: BTreeSet<PermissionId>,
}

impl Role {
    /// Creates a validated role.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        category: impl Into<String>,
        permission_ids: impl IntoIterator<Item = PermissionId>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            category: NonEmptyString::new(category)?,
            permission_ids: permission_ids.into_iter().collect(),
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the role category, e.g. `management`.
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Returns the granted permissions.
    #[must_use]
    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.permission_ids
    }

    /// Adds a permission; returns whether it was new.
    pub fn grant(&mut self, permission_id: PermissionId) -> bool {
        self.permission_ids.insert(permission_id)
    }

    /// Removes a permission; returns whether it was present.
    pub fn revoke(&mut self, permission_id: PermissionId) -> bool {
        self.permission_ids.remove(&permission_id)
    }
}
