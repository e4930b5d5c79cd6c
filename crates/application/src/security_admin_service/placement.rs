use super::*;

use orgauth_domain::{PermissionOverride, actions};

use crate::{AssignmentListQuery, PlaceEmployeeInput};

impl SecurityAdminService {
    /// Lists active assignments narrowed to the actor's department.
    pub async fn list_assignments(
        &self,
        actor: &ActorIdentity,
        query: AssignmentListQuery,
    ) -> AppResult<Vec<Assignment>> {
        self.guard
            .require_permission(actor.employee_id(), actions::PERMISSION_READ)
            .await?;

        let query = self
            .department_guard
            .department_filter(actor.employee_id(), query)
            .await?;
        self.assignment_service.list(query).await
    }

    /// Places an employee, replacing any active assignment atomically.
    ///
    /// The destination must lie in the actor's subtree and department. An
    /// already-placed employee, the actor included, must also be governed by
    /// the actor, and the actor must hold everything the placement grants.
    pub async fn place_employee(
        &self,
        actor: &ActorIdentity,
        input: PlaceEmployeeInput,
    ) -> AppResult<Assignment> {
        self.guard
            .require_permission(actor.employee_id(), actions::EMPLOYEE_PLACE)
            .await?;
        self.ensure_within_reach(actor, input.org_node_id, Some(input.department))
            .await?;

        let current = self
            .assignment_service
            .active_assignment(input.employee_id)
            .await?;
        if current.is_some() || input.employee_id == actor.employee_id() {
            self.guard
                .require_action(actor.employee_id(), input.employee_id, actions::EMPLOYEE_PLACE)
                .await?;
        }
        self.ensure_grantable(actor, Some(input.role_id), &input.overrides)
            .await?;
        self.ensure_settled(input.employee_id).await?;

        let employee_id = input.employee_id;
        let (assignment, previous) = self.assignment_service.create_or_replace(input).await?;
        let mut nodes = vec![assignment.org_node_id()];
        nodes.extend(previous.as_ref().map(Assignment::org_node_id));
        self.guard
            .aggregator()
            .invalidate_around(&[employee_id], &nodes)
            .await?;
        tracing::info!(
            employee_id = %employee_id,
            org_node_id = %assignment.org_node_id(),
            "employee placed"
        );

        self.append_audit(
            actor.subject(),
            AuditAction::AssignmentPlaced,
            "assignment",
            assignment.id().to_string(),
            format!(
                "placed '{employee_id}' at '{}' in {}",
                assignment.org_node_id(),
                assignment.department().as_str()
            ),
        )
        .await?;

        Ok(assignment)
    }

    /// Deactivates the employee's active assignment.
    pub async fn remove_employee(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
    ) -> AppResult<()> {
        self.guard
            .require_action(actor.employee_id(), employee_id, actions::EMPLOYEE_PLACE)
            .await?;
        self.ensure_settled(employee_id).await?;

        let assignment = self
            .assignment_service
            .active_assignment(employee_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("employee '{employee_id}' has no active assignment"))
            })?;
        self.assignment_service.deactivate(assignment.id()).await?;
        self.guard
            .aggregator()
            .invalidate_around(&[employee_id], &[assignment.org_node_id()])
            .await?;

        self.append_audit(
            actor.subject(),
            AuditAction::AssignmentRemoved,
            "assignment",
            assignment.id().to_string(),
            format!("removed '{employee_id}'"),
        )
        .await
    }

    /// Replaces the overrides on an employee's active assignment.
    pub async fn set_assignment_overrides(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
        overrides: Vec<PermissionOverride>,
    ) -> AppResult<Assignment> {
        self.guard
            .require_action(actor.employee_id(), employee_id, actions::SECURITY_ROLE_MANAGE)
            .await?;
        self.ensure_grantable(actor, None, &overrides).await?;
        self.ensure_settled(employee_id).await?;

        let assignment = self
            .assignment_service
            .set_overrides(employee_id, overrides)
            .await?;
        self.guard
            .aggregator()
            .invalidate_around(&[employee_id], &[assignment.org_node_id()])
            .await?;

        self.append_audit(
            actor.subject(),
            AuditAction::AssignmentOverridesChanged,
            "assignment",
            assignment.id().to_string(),
            format!(
                "set {} override(s) for '{employee_id}'",
                assignment.permission_overrides().len()
            ),
        )
        .await?;

        Ok(assignment)
    }
}
