use super::*;

use orgauth_domain::{LeaveRelease, LeaveWindow};

use crate::GrantUpdate;

/// Input payload for a leave request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyLeaveInput {
    /// First instant of the leave.
    pub starts_at: DateTime<Utc>,
    /// Instant the leave is over.
    pub ends_at: DateTime<Utc>,
    /// Reason given by the employee.
    pub reason: String,
}

impl LifecycleService {
    /// Records a leave request for `employee_id`.
    pub async fn apply_leave(
        &self,
        actor: &ActorIdentity,
        employee_id: EmployeeId,
        input: ApplyLeaveInput,
    ) -> AppResult<EmployeeLifecycle> {
        self.guard
            .require_action(actor.employee_id(), employee_id, actions::LEAVE_APPLY)
            .await?;
        self.require_assignment(employee_id, "take leave from").await?;

        let window = LeaveWindow::new(input.starts_at, input.ends_at)?;
        let mut lifecycle = self.load(employee_id).await?;
        lifecycle.apply_leave(window, input.reason.as_str(), Utc::now())?;

        self.commit(LifecycleCommit {
            records: vec![lifecycle.clone()],
            grants: Vec::new(),
        })
        .await?;
        tracing::info!(employee_id = %employee_id, "leave applied");

        self.record(
            actor.subject().as_str(),
            AuditAction::LeaveApplied,
            employee_id,
            format!(
                "leave from {} to {}: {}",
                window.starts_at().to_rfc3339(),
                window.ends_at().to_rfc3339(),
                input.reason.trim()
            ),
        )
        .await?;
        self.notify(
            employee_id,
            NotificationKind::LeaveApplied,
            format!("Your leave request until {} was recorded.", window.ends_at().to_rfc3339()),
        )
        .await;

        Ok(stored(lifecycle))
    }

    /// Accepts a pending leave and delegates the leave-taker's authority.
    ///
    /// The leave-taker's grants are snapshotted then cleared, and the
    /// delegate's overrides become the union of their own and the
    /// leave-taker's pre-leave direct permissions, all in one commit.
    pub async fn accept_leave(
        &self,
        actor: &ActorIdentity,
        leave_taker_id: EmployeeId,
        delegate_id: EmployeeId,
    ) -> AppResult<EmployeeLifecycle> {
        self.guard
            .require_action(actor.employee_id(), leave_taker_id, actions::LEAVE_APPROVE)
            .await?;

        if delegate_id == leave_taker_id {
            return Err(AppError::Validation(
                "an employee cannot delegate leave authority to themselves".to_owned(),
            ));
        }

        let now = Utc::now();
        let taker_assignment = self
            .require_assignment(leave_taker_id, "delegate")
            .await?;
        let delegate_assignment = self
            .require_assignment(delegate_id, "receive delegated authority into")
            .await?;

        let mut taker = self.load(leave_taker_id).await?;
        let mut delegate = self.load(delegate_id).await?;
        let pre_leave = taker_assignment.grants().clone();

        taker.accept_leave(delegate_id, actor.employee_id(), &pre_leave, now)?;
        delegate.hold_delegation(leave_taker_id, delegate_assignment.grants(), now)?;

        let transferred = self.transferable_overrides(&pre_leave).await?;
        let delegate_grants = delegate_assignment.grants().merged_with(transferred);

        self.commit(LifecycleCommit {
            records: vec![taker.clone(), delegate],
            grants: vec![
                GrantUpdate {
                    assignment_id: taker_assignment.id(),
                    grants: GrantState::cleared(),
                },
                GrantUpdate {
                    assignment_id: delegate_assignment.id(),
                    grants: delegate_grants,
                },
            ],
        })
        .await?;
        tracing::info!(
            leave_taker_id = %leave_taker_id,
            delegate_id = %delegate_id,
            "leave accepted and authority delegated"
        );

        self.invalidate(
            &[leave_taker_id, delegate_id],
            &[taker_assignment.org_node_id(), delegate_assignment.org_node_id()],
        )
        .await?;
        self.record(
            actor.subject().as_str(),
            AuditAction::LeaveAccepted,
            leave_taker_id,
            format!("authority delegated to '{delegate_id}'"),
        )
        .await?;
        self.notify(
            leave_taker_id,
            NotificationKind::LeaveAccepted,
            "Your leave was accepted.".to_owned(),
        )
        .await;
        self.notify(
            delegate_id,
            NotificationKind::DelegationReceived,
            format!("You hold the permissions of '{leave_taker_id}' for the duration of their leave."),
        )
        .await;

        Ok(stored(taker))
    }

    /// Rejects a pending leave. No grants change.
    pub async fn reject_leave(
        &self,
        actor: &ActorIdentity,
        leave_taker_id: EmployeeId,
        reason: &str,
    ) -> AppResult<EmployeeLifecycle> {
        self.guard
            .require_action(actor.employee_id(), leave_taker_id, actions::LEAVE_APPROVE)
            .await?;

        let mut lifecycle = self.load(leave_taker_id).await?;
        lifecycle.reject_leave(actor.employee_id(), reason)?;

        self.commit(LifecycleCommit {
            records: vec![lifecycle.clone()],
            grants: Vec::new(),
        })
        .await?;
        tracing::info!(leave_taker_id = %leave_taker_id, "leave rejected");

        self.record(
            actor.subject().as_str(),
            AuditAction::LeaveRejected,
            leave_taker_id,
            format!("rejected: {}", reason.trim()),
        )
        .await?;
        self.notify(
            leave_taker_id,
            NotificationKind::LeaveRejected,
            format!("Your leave was rejected: {}", reason.trim()),
        )
        .await;

        Ok(stored(lifecycle))
    }

    /// Ends a leave early.
    ///
    /// The leave-taker may always take back their own leave, even though
    /// their grants are withdrawn while it is accepted.
    pub async fn take_back_leave(
        &self,
        actor: &ActorIdentity,
        leave_taker_id: EmployeeId,
    ) -> AppResult<LeaveRelease> {
        if actor.employee_id() != leave_taker_id {
            self.guard
                .require_action(actor.employee_id(), leave_taker_id, actions::LEAVE_APPROVE)
                .await?;
        }

        self.end_leave(actor.subject().as_str(), leave_taker_id, Utc::now())
            .await
    }

    /// Ends a leave whose window has passed.
    pub(crate) async fn expire_leave(
        &self,
        leave_taker_id: EmployeeId,
        now: DateTime<Utc>,
    ) -> AppResult<LeaveRelease> {
        self.end_leave(SYSTEM_SUBJECT, leave_taker_id, now).await
    }

    async fn end_leave(
        &self,
        subject: &str,
        leave_taker_id: EmployeeId,
        now: DateTime<Utc>,
    ) -> AppResult<LeaveRelease> {
        let mut attempt = 0;
        let (release, nodes) = loop {
            attempt += 1;
            match self.try_end_leave(leave_taker_id, now).await {
                Err(error) if retryable(&error, attempt) => {
                    tracing::warn!(
                        leave_taker_id = %leave_taker_id,
                        attempt,
                        "concurrent leave release detected, re-reading"
                    );
                }
                other => break other?,
            }
        };

        match &release {
            LeaveRelease::AlreadyRestored => {}
            LeaveRelease::Withdrawn => {
                tracing::info!(leave_taker_id = %leave_taker_id, "pending leave withdrawn");
                self.record(
                    subject,
                    AuditAction::LeaveWithdrawn,
                    leave_taker_id,
                    "pending leave withdrawn".to_owned(),
                )
                .await?;
            }
            LeaveRelease::Restored { delegate_id, .. } => {
                tracing::info!(
                    leave_taker_id = %leave_taker_id,
                    delegate_id = %delegate_id,
                    "leave ended and authority returned"
                );
                self.invalidate(&[leave_taker_id, *delegate_id], &nodes)
                    .await?;
                self.record(
                    subject,
                    AuditAction::LeaveTakenBack,
                    leave_taker_id,
                    format!("authority returned from '{delegate_id}'"),
                )
                .await?;
                self.notify(
                    leave_taker_id,
                    NotificationKind::LeaveEnded,
                    "Your leave has ended and your permissions are restored.".to_owned(),
                )
                .await;
                self.notify(
                    *delegate_id,
                    NotificationKind::DelegationEnded,
                    format!("The permissions you held for '{leave_taker_id}' were returned."),
                )
                .await;
            }
        }

        Ok(release)
    }

    async fn try_end_leave(
        &self,
        leave_taker_id: EmployeeId,
        now: DateTime<Utc>,
    ) -> AppResult<(LeaveRelease, Vec<OrgNodeId>)> {
        let mut taker = self.load(leave_taker_id).await?;
        let release = taker.take_back_leave(now)?;

        let mut commit = LifecycleCommit::default();
        let mut nodes = Vec::new();

        match &release {
            LeaveRelease::AlreadyRestored => return Ok((release, nodes)),
            LeaveRelease::Withdrawn => {}
            LeaveRelease::Restored {
                snapshot,
                delegate_id,
            } => {
                let taker_assignment = self.assignments.find_active(leave_taker_id).await?;
                match &taker_assignment {
                    Some(assignment) => commit.grants.push(GrantUpdate {
                        assignment_id: assignment.id(),
                        grants: snapshot.grants.clone(),
                    }),
                    None => tracing::warn!(
                        leave_taker_id = %leave_taker_id,
                        "leave-taker lost their assignment during leave, snapshot not replayed"
                    ),
                }
                nodes.extend(node_of(taker_assignment.as_ref()));

                let mut delegate = self.load(*delegate_id).await?;
                match delegate.release_delegation(leave_taker_id) {
                    Some(hold) => {
                        let delegate_assignment = self.assignments.find_active(*delegate_id).await?;
                        if let Some(assignment) = &delegate_assignment {
                            commit.grants.push(GrantUpdate {
                                assignment_id: assignment.id(),
                                grants: hold.grants,
                            });
                        }
                        nodes.extend(node_of(delegate_assignment.as_ref()));
                        commit.records.push(delegate);
                    }
                    None => tracing::error!(
                        leave_taker_id = %leave_taker_id,
                        delegate_id = %delegate_id,
                        "delegate holds no delegation for this leave"
                    ),
                }
            }
        }

        commit.records.insert(0, taker);
        self.commit(commit).await?;
        Ok((release, nodes))
    }
}
