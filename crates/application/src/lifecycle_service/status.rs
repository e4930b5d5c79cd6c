use super::*;

use orgauth_domain::{RestrictionKind, StatusRelease, StatusRestriction};

use crate::GrantUpdate;

/// Input payload for suspension, block or termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionInput {
    /// Reason recorded with the restriction.
    pub reason: String,
    /// When the restriction lapses automatically, if ever.
    pub ends_at: Option<DateTime<Utc>>,
}

impl LifecycleService {
    /// Suspends an employee; grants stay in place.
    pub async fn suspend(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
        input: RestrictionInput,
    ) -> AppResult<EmployeeLifecycle> {
        self.impose(actor, employee_id, RestrictionKind::Suspension, input)
            .await
    }

    /// Blocks an employee; the role reference and overrides are withdrawn.
    pub async fn block(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
        input: RestrictionInput,
    ) -> AppResult<EmployeeLifecycle> {
        self.impose(actor, employee_id, RestrictionKind::Block, input)
            .await
    }

    /// Terminates an employee; the role reference and overrides are withdrawn.
    pub async fn terminate(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
        input: RestrictionInput,
    ) -> AppResult<EmployeeLifecycle> {
        self.impose(actor, employee_id, RestrictionKind::Termination, input)
            .await
    }

    /// Lifts the active restriction and replays the snapshot.
    pub async fn restore(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
    ) -> AppResult<StatusRelease> {
        self.guard
            .require_action(actor.employee_id(), employee_id, actions::EMPLOYEE_RESTORE)
            .await?;

        self.lift(actor.subject().as_str(), employee_id).await
    }

    /// Lifts a restriction whose end date has passed.
    pub(crate) async fn lapse_restriction(&self, employee_id: EmployeeId) -> AppResult<StatusRelease> {
        self.lift(SYSTEM_SUBJECT, employee_id).await
    }

    async fn impose(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
        kind: RestrictionKind,
        input: RestrictionInput,
    ) -> AppResult<EmployeeLifecycle> {
        self.guard
            .require_action(actor.employee_id(), employee_id, required_action(kind))
            .await?;

        let now = Utc::now();
        let assignment = self.require_assignment(employee_id, kind.as_str()).await?;
        let mut lifecycle = self.load(employee_id).await?;
        let next_grants = lifecycle.impose(
            StatusRestriction {
                kind,
                reason: input.reason.trim().to_owned(),
                imposed_by: actor.employee_id(),
                starts_at: now,
                ends_at: input.ends_at,
            },
            assignment.grants(),
            now,
        )?;

        self.commit(LifecycleCommit {
            records: vec![lifecycle.clone()],
            grants: vec![GrantUpdate {
                assignment_id: assignment.id(),
                grants: next_grants,
            }],
        })
        .await?;
        tracing::info!(employee_id = %employee_id, restriction = kind.as_str(), "restriction imposed");

        self.invalidate(&[employee_id], &[assignment.org_node_id()])
            .await?;
        self.record(
            actor.subject().as_str(),
            imposed_audit_action(kind),
            employee_id,
            format!("{} {}: {}", kind.as_str(), describe_until(input.ends_at), input.reason.trim()),
        )
        .await?;
        self.notify(
            employee_id,
            NotificationKind::StatusRestricted,
            format!(
                "Your employment status changed to {} {}.",
                lifecycle.decision_status().as_str(),
                describe_until(input.ends_at)
            ),
        )
        .await;

        Ok(stored(lifecycle))
    }

    async fn lift(&self, subject: &str, employee_id: EmployeeId) -> AppResult<StatusRelease> {
        let mut attempt = 0;
        let (release, node) = loop {
            attempt += 1;
            match self.try_lift(employee_id).await {
                Err(error) if retryable(&error, attempt) => {
                    tracing::warn!(
                        employee_id = %employee_id,
                        attempt,
                        "concurrent restore detected, re-reading"
                    );
                }
                other => break other?,
            }
        };

        if let StatusRelease::Restored(_) = &release {
            tracing::info!(employee_id = %employee_id, "restriction lifted");
            let nodes: Vec<OrgNodeId> = node.into_iter().collect();
            self.invalidate(&[employee_id], &nodes).await?;
            self.record(
                subject,
                AuditAction::EmployeeRestored,
                employee_id,
                "restriction lifted".to_owned(),
            )
            .await?;
            self.notify(
                employee_id,
                NotificationKind::StatusRestored,
                "Your employment status was restored.".to_owned(),
            )
            .await;
        }

        Ok(release)
    }

    async fn try_lift(&self, employee_id: EmployeeId) -> AppResult<(StatusRelease, Option<OrgNodeId>)> {
        let mut lifecycle = self.load(employee_id).await?;
        let release = lifecycle.restore()?;

        let StatusRelease::Restored(snapshot) = &release else {
            return Ok((release, None));
        };

        let assignment = self.assignments.find_active(employee_id).await?;
        let mut commit = LifecycleCommit {
            records: vec![lifecycle],
            grants: Vec::new(),
        };
        match &assignment {
            Some(assignment) => commit.grants.push(GrantUpdate {
                assignment_id: assignment.id(),
                grants: snapshot.grants.clone(),
            }),
            None => tracing::warn!(
                employee_id = %employee_id,
                "restored employee has no active assignment, snapshot not replayed"
            ),
        }

        self.commit(commit).await?;
        Ok((release, node_of(assignment.as_ref())))
    }
}

fn required_action(kind: RestrictionKind) -> &'static str {
    match kind {
        RestrictionKind::Suspension => actions::EMPLOYEE_SUSPEND,
        RestrictionKind::Block => actions::EMPLOYEE_BLOCK,
        RestrictionKind::Termination => actions::EMPLOYEE_TERMINATE,
    }
}

fn imposed_audit_action(kind: RestrictionKind) -> AuditAction {
    match kind {
        RestrictionKind::Suspension => AuditAction::EmployeeSuspended,
        RestrictionKind::Block => AuditAction::EmployeeBlocked,
        RestrictionKind::Termination => AuditAction::EmployeeTerminated,
    }
}
