//! Leave delegation and status transitions.
//!
//! Each use-case loads the affected lifecycle records and assignments,
//! runs the domain transition, and writes everything through one
//! [`LifecycleCommit`]. Audit and notifications follow the commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use orgauth_core::{ActorIdentity, AppError, AppResult, EmployeeId, OrgNodeId};
use orgauth_domain::{
    Assignment, AuditAction, EmployeeLifecycle, GrantState, PermissionOverride, actions,
};

use crate::{
    AssignmentRepository, AuditEvent, AuditRepository, HierarchyGuard, LifecycleCommit,
    LifecycleRepository, Notification, NotificationKind, NotificationSender, RoleRepository,
};

mod leave;
mod status;

pub use leave::ApplyLeaveInput;
pub use status::RestrictionInput;

const COMMIT_ATTEMPTS: usize = 3;
const SYSTEM_SUBJECT: &str = "system:status-sweep";

/// Application service for the employee lifecycle state machine.
#[derive(Clone)]
pub struct LifecycleService {
    guard: HierarchyGuard,
    lifecycles: Arc<dyn LifecycleRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    roles: Arc<dyn RoleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    notifications: Arc<dyn NotificationSender>,
}

impl LifecycleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        guard: HierarchyGuard,
        lifecycles: Arc<dyn LifecycleRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        roles: Arc<dyn RoleRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        notifications: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            guard,
            lifecycles,
            assignments,
            roles,
            audit_repository,
            notifications,
        }
    }

    /// Returns an employee's lifecycle, visible to themselves or to readers
    /// allowed to act on them.
    pub async fn lifecycle_for(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
    ) -> AppResult<EmployeeLifecycle> {
        if actor.employee_id() != employee_id {
            self.guard
                .require_action(actor.employee_id(), employee_id, actions::PERMISSION_READ)
                .await?;
        }

        self.load(employee_id).await
    }

    async fn load(&self, employee_id: EmployeeId) -> AppResult<EmployeeLifecycle> {
        let lifecycle = self
            .lifecycles
            .find(employee_id)
            .await?
            .unwrap_or_else(|| EmployeeLifecycle::new(employee_id));
        lifecycle.check_invariants()?;
        Ok(lifecycle)
    }

    async fn require_assignment(
        &self,
        employee_id: EmployeeId,
        attempted: &str,
    ) -> AppResult<Assignment> {
        self.assignments
            .find_active(employee_id)
            .await?
            .ok_or_else(|| {
                AppError::InvalidTransition(format!(
                    "employee '{employee_id}' has no active assignment to {attempted}"
                ))
            })
    }

    /// Expands grants into overrides: existing overrides first, then role permissions.
    async fn transferable_overrides(&self, grants: &GrantState) -> AppResult<Vec<PermissionOverride>> {
        let mut transferred = grants.overrides.clone();
        if let Some(role_id) = grants.role_id {
            for role in self.roles.find_roles(&[role_id]).await? {
                transferred.extend(
                    role.permission_ids()
                        .iter()
                        .copied()
                        .map(PermissionOverride::grant),
                );
            }
        }

        Ok(transferred)
    }

    async fn commit(&self, commit: LifecycleCommit) -> AppResult<()> {
        self.lifecycles.commit(commit).await.inspect_err(|error| {
            if !matches!(error, AppError::Conflict(_)) {
                tracing::error!(error = %error, "lifecycle commit failed");
            }
        })
    }

    async fn invalidate(&self, employee_ids: &[EmployeeId], node_ids: &[OrgNodeId]) -> AppResult<()> {
        self.guard
            .aggregator()
            .invalidate_around(employee_ids, node_ids)
            .await
    }

    async fn record(
        &self,
        subject: &str,
        action: AuditAction,
        employee_id: EmployeeId,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                subject: subject.to_owned(),
                action,
                resource_type: "employee_lifecycle".to_owned(),
                resource_id: employee_id.to_string(),
                detail: Some(detail),
            })
            .await
            .inspect_err(|error| {
                tracing::error!(
                    employee_id = %employee_id,
                    action = action.as_str(),
                    error = %error,
                    "audit append failed after committed transition"
                );
            })
    }

    async fn notify(&self, recipient: EmployeeId, kind: NotificationKind, body: String) {
        let notification = Notification {
            recipient,
            kind,
            subject: notification_subject(kind).to_owned(),
            body,
        };

        if let Err(error) = self.notifications.send(notification).await {
            tracing::warn!(
                recipient = %recipient,
                kind = kind.as_str(),
                error = %error,
                "lifecycle notification failed"
            );
        }
    }
}

fn notification_subject(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::LeaveApplied => "Leave request received",
        NotificationKind::LeaveAccepted => "Leave accepted",
        NotificationKind::LeaveRejected => "Leave rejected",
        NotificationKind::DelegationReceived => "You are covering a colleague's leave",
        NotificationKind::LeaveEnded => "Welcome back",
        NotificationKind::DelegationEnded => "Delegated authority returned",
        NotificationKind::StatusRestricted => "Employment status changed",
        NotificationKind::StatusRestored => "Employment status restored",
    }
}

fn stored(lifecycle: EmployeeLifecycle) -> EmployeeLifecycle {
    let version = lifecycle.version() + 1;
    lifecycle.with_version(version)
}

fn node_of(assignment: Option<&Assignment>) -> Option<OrgNodeId> {
    assignment.map(Assignment::org_node_id)
}

fn retryable(error: &AppError, attempt: usize) -> bool {
    matches!(error, AppError::Conflict(_)) && attempt < COMMIT_ATTEMPTS
}

fn describe_until(ends_at: Option<DateTime<Utc>>) -> String {
    ends_at.map_or_else(
        || "until further notice".to_owned(),
        |ends_at| format!("until {}", ends_at.to_rfc3339()),
    )
}

#[cfg(test)]
mod tests;
