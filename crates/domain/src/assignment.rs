use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use orgauth_core::{AppError, AppResult, AssignmentId, EmployeeId, OrgNodeId, PermissionId, RoleId};
use serde::{Deserialize, Serialize};

use crate::{DepartmentCode, PermissionOverride};

/// Role, position and overrides an employee currently holds.
///
/// This is the per-employee grant state lifecycle transitions snapshot and
/// restore.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrantState {
    /// Role reference; absent while blocked, terminated or on delegated leave.
    pub role_id: Option<RoleId>,
    /// Additive overrides, unique per permission.
    pub overrides: Vec<PermissionOverride>,
}

impl GrantState {
    /// Creates a grant state, keeping the first override per permission.
    #[must_use]
    pub fn new(role_id: Option<RoleId>, overrides: impl IntoIterator<Item = PermissionOverride>) -> Self {
        Self {
            role_id,
            overrides: dedup_overrides(overrides),
        }
    }

    /// Returns the state with no role and no overrides.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Returns the override for `permission_id`, if present.
    #[must_use]
    pub fn override_for(&self, permission_id: PermissionId) -> Option<&PermissionOverride> {
        self.overrides
            .iter()
            .find(|value| value.permission_id == permission_id)
    }

    /// Returns this state with `granted` merged in as a set union.
    ///
    /// Existing overrides win over incoming ones for the same permission.
    #[must_use]
    pub fn merged_with(&self, granted: impl IntoIterator<Item = PermissionOverride>) -> Self {
        Self::new(
            self.role_id,
            self.overrides.iter().copied().chain(granted),
        )
    }
}

fn dedup_overrides(overrides: impl IntoIterator<Item = PermissionOverride>) -> Vec<PermissionOverride> {
    let mut unique: BTreeMap<PermissionId, PermissionOverride> = BTreeMap::new();
    for value in overrides {
        unique.entry(value.permission_id).or_insert(value);
    }

    unique.into_values().collect()
}

/// Binding of one employee to a role, org node and department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    id: AssignmentId,
    employee_id: EmployeeId,
    org_node_id: OrgNodeId,
    department: DepartmentCode,
    grants: GrantState,
    is_active: bool,
    effective_from: DateTime<Utc>,
    effective_until: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Creates an active assignment starting at `effective_from`.
    #[must_use]
    pub fn new(
        employee_id: EmployeeId,
        role_id: RoleId,
        org_node_id: OrgNodeId,
        department: DepartmentCode,
        overrides: impl IntoIterator<Item = PermissionOverride>,
        effective_from: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            employee_id,
            org_node_id,
            department,
            grants: GrantState::new(Some(role_id), overrides),
            is_active: true,
            effective_from,
            effective_until: None,
        }
    }

    /// Rehydrates a stored assignment.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: AssignmentId,
        employee_id: EmployeeId,
        org_node_id: OrgNodeId,
        department: DepartmentCode,
        grants: GrantState,
        is_active: bool,
        effective_from: DateTime<Utc>,
        effective_until: Option<DateTime<Utc>>,
    ) -> AppResult<Self> {
        if effective_until.is_some_and(|until| until < effective_from) {
            return Err(AppError::Validation(format!(
                "assignment '{id}' ends before it starts"
            )));
        }

        Ok(Self {
            id,
            employee_id,
            org_node_id,
            department,
            grants,
            is_active,
            effective_from,
            effective_until,
        })
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    /// Returns the assigned employee.
    #[must_use]
    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Returns the role reference, absent while grants are withdrawn.
    #[must_use]
    pub fn role_id(&self) -> Option<RoleId> {
        self.grants.role_id
    }

    /// Returns the org node the employee is placed at.
    #[must_use]
    pub fn org_node_id(&self) -> OrgNodeId {
        self.org_node_id
    }

    /// Returns the department of the placement.
    #[must_use]
    pub fn department(&self) -> DepartmentCode {
        self.department
    }

    /// Returns the per-employee grant state.
    #[must_use]
    pub fn grants(&self) -> &GrantState {
        &self.grants
    }

    /// Returns the permission overrides.
    #[must_use]
    pub fn permission_overrides(&self) -> &[PermissionOverride] {
        self.grants.overrides.as_slice()
    }

    /// Returns whether this is the employee's current assignment.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns when the assignment took effect.
    #[must_use]
    pub fn effective_from(&self) -> DateTime<Utc> {
        self.effective_from
    }

    /// Returns when the assignment stopped being effective.
    #[must_use]
    pub fn effective_until(&self) -> Option<DateTime<Utc>> {
        self.effective_until
    }

    /// Replaces the grant state.
    pub fn set_grants(&mut self, grants: GrantState) {
        self.grants = grants;
    }

    /// Replaces the overrides, keeping the role.
    pub fn set_overrides(&mut self, overrides: impl IntoIterator<Item = PermissionOverride>) {
        self.grants = GrantState::new(self.grants.role_id, overrides);
    }

    /// Deactivates the assignment at `at`. Assignments are never hard-deleted.
    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        if self.is_active {
            self.is_active = false;
            self.effective_until = Some(at.max(self.effective_from));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use orgauth_core::{EmployeeId, OrgNodeId, PermissionId, RoleId};

    use super::{Assignment, GrantState};
    use crate::{DepartmentCode, PermissionOverride};

    #[test]
    fn overrides_are_deduplicated_by_permission() {
        let permission_id = PermissionId::new();
        let grants = GrantState::new(
            None,
            [
                PermissionOverride {
                    permission_id,
                    bypass_hierarchy: true,
                },
                PermissionOverride::grant(permission_id),
            ],
        );

        assert_eq!(grants.overrides.len(), 1);
        assert!(grants.overrides[0].bypass_hierarchy);
    }

    #[test]
    fn merge_is_a_union() {
        let shared = PermissionId::new();
        let incoming = PermissionId::new();
        let grants = GrantState::new(Some(RoleId::new()), [PermissionOverride::grant(shared)]);

        let merged = grants.merged_with([
            PermissionOverride::grant(shared),
            PermissionOverride::grant(incoming),
        ]);

        assert_eq!(merged.overrides.len(), 2);
        assert_eq!(merged.role_id, grants.role_id);
    }

    #[test]
    fn deactivate_stamps_effective_until_once() {
        let mut assignment = Assignment::new(
            EmployeeId::new(),
            RoleId::new(),
            OrgNodeId::new(),
            DepartmentCode::Finance,
            [],
            Utc::now(),
        );
        let first = Utc::now();
        assignment.deactivate(first);
        let stamped = assignment.effective_until();
        assignment.deactivate(Utc::now());

        assert!(!assignment.is_active());
        assert_eq!(assignment.effective_until(), stamped);
    }
}
