use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgauth_application::{AssignmentListQuery, AssignmentRepository};
use orgauth_core::{AppError, AppResult, AssignmentId, EmployeeId, OrgNodeId};
use orgauth_domain::{Assignment, GrantState};

use super::InMemoryOrganizationStore;

#[async_trait]
impl AssignmentRepository for InMemoryOrganizationStore {
    async fn find_active(&self, employee_id: EmployeeId) -> AppResult<Option<Assignment>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .iter()
            .find(|assignment| assignment.is_active() && assignment.employee_id() == employee_id)
            .cloned())
    }

    async fn list_active_at_nodes(&self, node_ids: &[OrgNodeId]) -> AppResult<Vec<Assignment>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.is_active() && node_ids.contains(&assignment.org_node_id())
            })
            .cloned()
            .collect())
    }

    async fn list_active(&self, query: AssignmentListQuery) -> AppResult<Vec<Assignment>> {
        let state = self.state.read().await;
        let mut assignments: Vec<&Assignment> = state
            .assignments
            .iter()
            .filter(|assignment| assignment.is_active())
            .filter(|assignment| {
                query
                    .department
                    .is_none_or(|department| assignment.department() == department)
            })
            .filter(|assignment| {
                query
                    .org_node_id
                    .is_none_or(|node_id| assignment.org_node_id() == node_id)
            })
            .collect();
        assignments.sort_by_key(|assignment| (assignment.effective_from(), assignment.id()));

        Ok(assignments
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn replace_active(&self, assignment: Assignment) -> AppResult<Option<Assignment>> {
        let mut state = self.state.write().await;
        let at = assignment.effective_from();

        let previous = state
            .assignments
            .iter_mut()
            .find(|existing| {
                existing.is_active() && existing.employee_id() == assignment.employee_id()
            })
            .map(|existing| {
                existing.deactivate(at);
                existing.clone()
            });
        state.assignments.push(assignment);

        Ok(previous)
    }

    async fn deactivate(&self, assignment_id: AssignmentId, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.write().await;
        let assignment = state
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id() == assignment_id && assignment.is_active())
            .ok_or_else(|| {
                AppError::NotFound(format!("active assignment '{assignment_id}' was not found"))
            })?;
        assignment.deactivate(at);

        Ok(())
    }

    async fn update_grants(&self, assignment_id: AssignmentId, grants: GrantState) -> AppResult<()> {
        let mut state = self.state.write().await;
        let assignment = state
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id() == assignment_id && assignment.is_active())
            .ok_or_else(|| {
                AppError::Conflict(format!("assignment '{assignment_id}' is no longer active"))
            })?;
        assignment.set_grants(grants);

        Ok(())
    }
}
