use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgauth_application::{LifecycleCommit, LifecycleRepository};
use orgauth_core::{AppError, AppResult, EmployeeId};
use orgauth_domain::{EmployeeLifecycle, LifecycleState};

use super::InMemoryOrganizationStore;

#[async_trait]
impl LifecycleRepository for InMemoryOrganizationStore {
    async fn find(&self, employee_id: EmployeeId) -> AppResult<Option<EmployeeLifecycle>> {
        Ok(self.state.read().await.lifecycles.get(&employee_id).cloned())
    }

    async fn commit(&self, commit: LifecycleCommit) -> AppResult<()> {
        let mut state = self.state.write().await;

        // Validate everything before the first write so a failed commit leaves no trace.
        for record in &commit.records {
            let stored = state
                .lifecycles
                .get(&record.employee_id())
                .map_or(0, EmployeeLifecycle::version);
            if stored != record.version() {
                return Err(AppError::Conflict(format!(
                    "lifecycle of employee '{}' changed concurrently",
                    record.employee_id()
                )));
            }
        }

        for update in &commit.grants {
            let is_active = state
                .assignments
                .iter()
                .any(|assignment| assignment.id() == update.assignment_id && assignment.is_active());
            if !is_active {
                return Err(AppError::Conflict(format!(
                    "assignment '{}' is no longer active",
                    update.assignment_id
                )));
            }
        }

        for record in commit.records {
            let next_version = record.version() + 1;
            state
                .lifecycles
                .insert(record.employee_id(), record.with_version(next_version));
        }

        for update in commit.grants {
            if let Some(assignment) = state
                .assignments
                .iter_mut()
                .find(|assignment| assignment.id() == update.assignment_id && assignment.is_active())
            {
                assignment.set_grants(update.grants);
            }
        }

        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<EmployeeLifecycle>> {
        let state = self.state.read().await;
        let mut due: Vec<EmployeeLifecycle> = state
            .lifecycles
            .values()
            .filter(|lifecycle| lifecycle.next_due_at().is_some_and(|due_at| due_at <= now))
            .cloned()
            .collect();
        due.sort_by_key(|lifecycle| (lifecycle.next_due_at(), lifecycle.employee_id()));

        Ok(due)
    }

    async fn list_on_accepted_leave(&self) -> AppResult<Vec<EmployeeLifecycle>> {
        let state = self.state.read().await;
        let mut on_leave: Vec<EmployeeLifecycle> = state
            .lifecycles
            .values()
            .filter(|lifecycle| lifecycle.state() == LifecycleState::OnLeaveAccepted)
            .cloned()
            .collect();
        on_leave.sort_by_key(EmployeeLifecycle::employee_id);

        Ok(on_leave)
    }
}
