use std::sync::Arc;

use chrono::Utc;
use orgauth_core::{AppError, AppResult, AssignmentId, EmployeeId, OrgNodeId, RoleId};
use orgauth_domain::{Assignment, DepartmentCode, PermissionOverride};

use crate::{
    AssignmentListQuery, AssignmentRepository, OrgTreeRepository, PermissionRepository,
    RoleRepository,
};

const REPLACE_ATTEMPTS: usize = 3;

/// Input payload for placing an employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceEmployeeInput {
    /// Employee being placed.
    pub employee_id: EmployeeId,
    /// Role granted by the placement.
    pub role_id: RoleId,
    /// Position in the tree.
    pub org_node_id: OrgNodeId,
    /// Department of the placement.
    pub department: DepartmentCode,
    /// Additive per-assignment overrides.
    pub overrides: Vec<PermissionOverride>,
}

/// Application service for employee placements.
#[derive(Clone)]
pub struct AssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    org_tree: Arc<dyn OrgTreeRepository>,
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
}

impl AssignmentService {
    /// Creates a new service from repository implementations.
    #[must_use]
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        org_tree: Arc<dyn OrgTreeRepository>,
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            assignments,
            org_tree,
            roles,
            permissions,
        }
    }

    /// Returns the employee's single active assignment.
    pub async fn active_assignment(&self, employee_id: EmployeeId) -> AppResult<Option<Assignment>> {
        self.assignments.find_active(employee_id).await
    }

    /// Lists active assignments.
    pub async fn list(&self, query: AssignmentListQuery) -> AppResult<Vec<Assignment>> {
        self.assignments.list_active(query).await
    }

    /// Activates a new placement, deactivating the previous one atomically.
    ///
    /// Returns the new assignment and the one it replaced.
    pub async fn create_or_replace(
        &self,
        input: PlaceEmployeeInput,
    ) -> AppResult<(Assignment, Option<Assignment>)> {
        let node = self
            .org_tree
            .find_node(input.org_node_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("org node '{}' was not found", input.org_node_id))
            })?;
        if !node.is_active() {
            return Err(AppError::Validation(format!(
                "cannot place employees at inactive org node '{}'",
                node.path()
            )));
        }
        if !node.department().covers(input.department) {
            return Err(AppError::Validation(format!(
                "department '{}' does not match org node '{}' ({})",
                input.department.as_str(),
                node.path(),
                node.department().as_str()
            )));
        }

        if self.roles.find_role(input.role_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                input.role_id
            )));
        }
        self.ensure_permissions_exist(&input.overrides).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let assignment = Assignment::new(
                input.employee_id,
                input.role_id,
                input.org_node_id,
                input.department,
                input.overrides.iter().copied(),
                Utc::now(),
            );

            match self.assignments.replace_active(assignment.clone()).await {
                Ok(previous) => return Ok((assignment, previous)),
                Err(AppError::Conflict(message)) if attempt < REPLACE_ATTEMPTS => {
                    tracing::warn!(
                        employee_id = %input.employee_id,
                        attempt,
                        %message,
                        "concurrent placement detected, retrying"
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Deactivates one assignment.
    pub async fn deactivate(&self, assignment_id: AssignmentId) -> AppResult<()> {
        self.assignments.deactivate(assignment_id, Utc::now()).await
    }

    /// Replaces the overrides on the employee's active assignment.
    pub async fn set_overrides(
        &self,
        employee_id: EmployeeId,
        overrides: Vec<PermissionOverride>,
    ) -> AppResult<Assignment> {
        self.ensure_permissions_exist(&overrides).await?;

        let mut assignment = self
            .assignments
            .find_active(employee_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "employee '{employee_id}' has no active assignment"
                ))
            })?;
        assignment.set_overrides(overrides);
        self.assignments
            .update_grants(assignment.id(), assignment.grants().clone())
            .await?;

        Ok(assignment)
    }

    async fn ensure_permissions_exist(&self, overrides: &[PermissionOverride]) -> AppResult<()> {
        let mut requested: Vec<_> = overrides.iter().map(|value| value.permission_id).collect();
        requested.sort();
        requested.dedup();

        let found = self.permissions.find_permissions(&requested).await?;
        if let Some(missing) = requested
            .iter()
            .find(|id| !found.iter().any(|permission| permission.id() == **id))
        {
            return Err(AppError::NotFound(format!(
                "permission '{missing}' was not found"
            )));
        }

        Ok(())
    }
}
