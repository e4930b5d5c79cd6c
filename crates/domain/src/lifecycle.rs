//! Reversible employment-status transitions.
//!
//! Every transition checks its precondition and leaves the record untouched
//! when it fails. Entering a non-normal state captures a [`StatusSnapshot`];
//! leaving it hands the snapshot back so the caller can replay it exactly.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use orgauth_core::{AppError, AppResult, EmployeeId};
use serde::{Deserialize, Serialize};

use crate::GrantState;

/// Named lifecycle state of one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Working normally.
    Normal,
    /// Leave requested, not yet decided.
    OnLeavePending,
    /// Leave accepted; authority delegated.
    OnLeaveAccepted,
    /// Suspended; grants kept but marked.
    Suspended,
    /// Blocked; role withdrawn.
    Blocked,
    /// Terminated; role withdrawn.
    Terminated,
}

impl LifecycleState {
    /// Returns a stable storage value for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::OnLeavePending => "on_leave_pending",
            Self::OnLeaveAccepted => "on_leave_accepted",
            Self::Suspended => "suspended",
            Self::Blocked => "blocked",
            Self::Terminated => "terminated",
        }
    }

    /// Returns whether a snapshot must exist in this state.
    #[must_use]
    pub fn requires_snapshot(&self) -> bool {
        matches!(
            self,
            Self::OnLeaveAccepted | Self::Suspended | Self::Blocked | Self::Terminated
        )
    }
}

impl FromStr for LifecycleState {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "normal" => Ok(Self::Normal),
            "on_leave_pending" => Ok(Self::OnLeavePending),
            "on_leave_accepted" => Ok(Self::OnLeaveAccepted),
            "suspended" => Ok(Self::Suspended),
            "blocked" => Ok(Self::Blocked),
            "terminated" => Ok(Self::Terminated),
            _ => Err(AppError::Validation(format!(
                "unknown lifecycle state '{value}'"
            ))),
        }
    }
}

/// HR decision status recorded on the employee.
///
/// `Restored` is not terminal; it behaves exactly like `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Employed in good standing.
    Approved,
    /// Suspended.
    Suspended,
    /// Blocked.
    Blocked,
    /// Terminated.
    Terminated,
    /// Returned to good standing after a restriction.
    Restored,
}

impl DecisionStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Suspended => "suspended",
            Self::Blocked => "blocked",
            Self::Terminated => "terminated",
            Self::Restored => "restored",
        }
    }

    /// Returns whether the employee is in good standing.
    #[must_use]
    pub fn is_in_good_standing(&self) -> bool {
        matches!(self, Self::Approved | Self::Restored)
    }
}

/// Restriction an administrator can place on an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    /// Temporary suspension.
    Suspension,
    /// Access block.
    Block,
    /// Termination.
    Termination,
}

impl RestrictionKind {
    /// Returns a stable storage value for this restriction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suspension => "suspension",
            Self::Block => "block",
            Self::Termination => "termination",
        }
    }

    /// Returns the lifecycle state the restriction moves into.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Suspension => LifecycleState::Suspended,
            Self::Block => LifecycleState::Blocked,
            Self::Termination => LifecycleState::Terminated,
        }
    }

    /// Returns the decision status recorded for the restriction.
    #[must_use]
    pub fn decision_status(&self) -> DecisionStatus {
        match self {
            Self::Suspension => DecisionStatus::Suspended,
            Self::Block => DecisionStatus::Blocked,
            Self::Termination => DecisionStatus::Terminated,
        }
    }

    /// Returns whether the role reference is withdrawn while restricted.
    #[must_use]
    pub fn withdraws_role(&self) -> bool {
        matches!(self, Self::Block | Self::Termination)
    }
}

/// Grant state captured before a reversible transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Role reference and overrides before the transition.
    pub grants: GrantState,
    /// Decision status before the transition.
    pub decision_status: DecisionStatus,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

/// Half-open leave period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl LeaveWindow {
    /// Creates a window that ends after it starts.
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> AppResult<Self> {
        if ends_at <= starts_at {
            return Err(AppError::Validation(
                "leave must end after it starts".to_owned(),
            ));
        }

        Ok(Self { starts_at, ends_at })
    }

    /// Returns the first instant of the leave.
    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Returns the instant the leave is over.
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }
}

/// Leave request and its delegation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    /// Requested period.
    pub window: LeaveWindow,
    /// Reason given by the leave-taker.
    pub reason: String,
    /// When the leave was requested.
    pub applied_at: DateTime<Utc>,
    /// Whether the leave is currently in effect.
    pub on_leave: bool,
    /// Whether the leave was accepted.
    pub accepted: bool,
    /// Who accepted the leave.
    pub accepted_by: Option<EmployeeId>,
    /// Whether the leave was rejected.
    pub rejected: bool,
    /// Who rejected the leave.
    pub rejected_by: Option<EmployeeId>,
    /// Why the leave was rejected.
    pub rejection_reason: Option<String>,
    /// Employee receiving the delegated permissions.
    pub transferred_role_to: Option<EmployeeId>,
    /// When authority returned to the leave-taker.
    pub returned_at: Option<DateTime<Utc>>,
}

/// Delegated authority held by a colleague covering someone's leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationHold {
    /// Employee on leave whose permissions are held.
    pub leave_taker_id: EmployeeId,
    /// The delegate's own grant state before the merge.
    pub snapshot: StatusSnapshot,
}

/// Active suspension, block or termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRestriction {
    /// Kind of restriction.
    pub kind: RestrictionKind,
    /// Reason recorded by the administrator.
    pub reason: String,
    /// Administrator who imposed it.
    pub imposed_by: EmployeeId,
    /// When it took effect.
    pub starts_at: DateTime<Utc>,
    /// When it lapses automatically, if ever.
    pub ends_at: Option<DateTime<Utc>>,
}

/// Outcome of ending a leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveRelease {
    /// Accepted leave ended; replay the snapshot and release the delegate.
    Restored {
        /// Leave-taker grants before the leave.
        snapshot: StatusSnapshot,
        /// Delegate that must release its hold.
        delegate_id: EmployeeId,
    },
    /// Pending leave withdrawn; nothing was transferred.
    Withdrawn,
    /// No leave in effect.
    AlreadyRestored,
}

/// Outcome of lifting a restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRelease {
    /// Restriction lifted; replay the snapshot.
    Restored(StatusSnapshot),
    /// Nothing to restore.
    AlreadyRestored,
}

/// Restoration the scheduled sweep should trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueRestoration {
    /// Leave end date passed.
    LeaveExpired,
    /// Restriction end date passed.
    RestrictionLapsed(RestrictionKind),
}

/// Lifecycle record of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeLifecycle {
    employee_id: EmployeeId,
    state: LifecycleState,
    decision_status: DecisionStatus,
    snapshot: Option<StatusSnapshot>,
    leave: Option<DelegationRecord>,
    restriction: Option<StatusRestriction>,
    delegation_hold: Option<DelegationHold>,
    version: u64,
}

impl EmployeeLifecycle {
    /// Creates the record of an employee in good standing.
    #[must_use]
    pub fn new(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            state: LifecycleState::Normal,
            decision_status: DecisionStatus::Approved,
            snapshot: None,
            leave: None,
            restriction: None,
            delegation_hold: None,
            version: 0,
        }
    }

    /// Returns the employee.
    #[must_use]
    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns the decision status.
    #[must_use]
    pub fn decision_status(&self) -> DecisionStatus {
        self.decision_status
    }

    /// Returns the snapshot held while in a non-normal state.
    #[must_use]
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }

    /// Returns the latest leave record.
    #[must_use]
    pub fn leave(&self) -> Option<&DelegationRecord> {
        self.leave.as_ref()
    }

    /// Returns the active restriction.
    #[must_use]
    pub fn restriction(&self) -> Option<&StatusRestriction> {
        self.restriction.as_ref()
    }

    /// Returns delegated authority this employee currently holds.
    #[must_use]
    pub fn delegation_hold(&self) -> Option<&DelegationHold> {
        self.delegation_hold.as_ref()
    }

    /// Returns the optimistic-concurrency version of the stored record.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the record with the version the store assigned it.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Checks that a snapshot exists exactly when the state requires one.
    pub fn check_invariants(&self) -> AppResult<()> {
        if self.state.requires_snapshot() != self.snapshot.is_some() {
            return Err(AppError::Internal(format!(
                "employee '{}' in state '{}' has {} snapshot",
                self.employee_id,
                self.state.as_str(),
                if self.snapshot.is_some() { "an unexpected" } else { "no" }
            )));
        }

        Ok(())
    }

    /// Records a leave request.
    pub fn apply_leave(
        &mut self,
        window: LeaveWindow,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        match self.state {
            LifecycleState::Normal => {}
            LifecycleState::OnLeavePending | LifecycleState::OnLeaveAccepted => {
                return Err(AppError::InvalidTransition(format!(
                    "employee '{}' already has an active leave",
                    self.employee_id
                )));
            }
            other => {
                return Err(AppError::InvalidTransition(format!(
                    "employee '{}' cannot apply for leave while {}",
                    self.employee_id,
                    other.as_str()
                )));
            }
        }
        self.ensure_not_holding("apply for leave")?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("leave reason is required".to_owned()));
        }

        self.leave = Some(DelegationRecord {
            window,
            reason: reason.to_owned(),
            applied_at: now,
            on_leave: false,
            accepted: false,
            accepted_by: None,
            rejected: false,
            rejected_by: None,
            rejection_reason: None,
            transferred_role_to: None,
            returned_at: None,
        });
        self.state = LifecycleState::OnLeavePending;
        Ok(())
    }

    /// Accepts the pending leave, snapshotting `current_grants`.
    pub fn accept_leave(
        &mut self,
        delegate_id: EmployeeId,
        accepted_by: EmployeeId,
        current_grants: &GrantState,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.state != LifecycleState::OnLeavePending {
            return Err(AppError::InvalidTransition(format!(
                "employee '{}' has no pending leave to accept",
                self.employee_id
            )));
        }

        if delegate_id == self.employee_id {
            return Err(AppError::Validation(
                "an employee cannot delegate leave authority to themselves".to_owned(),
            ));
        }

        let Some(leave) = self.leave.as_mut() else {
            return Err(AppError::Internal(format!(
                "employee '{}' is pending leave without a leave record",
                self.employee_id
            )));
        };

        leave.accepted = true;
        leave.on_leave = true;
        leave.accepted_by = Some(accepted_by);
        leave.transferred_role_to = Some(delegate_id);
        self.snapshot = Some(StatusSnapshot {
            grants: current_grants.clone(),
            decision_status: self.decision_status,
            captured_at: now,
        });
        self.state = LifecycleState::OnLeaveAccepted;
        Ok(())
    }

    /// Rejects the pending leave. Nothing was transferred, so no grants change.
    pub fn reject_leave(&mut self, rejected_by: EmployeeId, reason: &str) -> AppResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "a reason is required to reject leave".to_owned(),
            ));
        }

        if self.state != LifecycleState::OnLeavePending {
            return Err(AppError::InvalidTransition(format!(
                "employee '{}' has no pending leave to reject",
                self.employee_id
            )));
        }

        if let Some(leave) = self.leave.as_mut() {
            leave.rejected = true;
            leave.rejected_by = Some(rejected_by);
            leave.rejection_reason = Some(reason.to_owned());
        }
        self.state = LifecycleState::Normal;
        Ok(())
    }

    /// Ends the leave. Repeated calls are no-ops.
    pub fn take_back_leave(&mut self, now: DateTime<Utc>) -> AppResult<LeaveRelease> {
        match self.state {
            LifecycleState::OnLeavePending => {
                if let Some(leave) = self.leave.as_mut() {
                    leave.returned_at = Some(now);
                }
                self.state = LifecycleState::Normal;
                Ok(LeaveRelease::Withdrawn)
            }
            LifecycleState::OnLeaveAccepted => {
                let delegate_id = self
                    .leave
                    .as_ref()
                    .and_then(|leave| leave.transferred_role_to)
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "accepted leave of '{}' has no delegate",
                            self.employee_id
                        ))
                    })?;
                let snapshot = self.snapshot.take().ok_or_else(|| {
                    AppError::Internal(format!(
                        "accepted leave of '{}' has no snapshot",
                        self.employee_id
                    ))
                })?;

                if let Some(leave) = self.leave.as_mut() {
                    leave.on_leave = false;
                    leave.returned_at = Some(now);
                }
                self.decision_status = snapshot.decision_status;
                self.state = LifecycleState::Normal;
                Ok(LeaveRelease::Restored {
                    snapshot,
                    delegate_id,
                })
            }
            _ => Ok(LeaveRelease::AlreadyRestored),
        }
    }

    /// Takes on a colleague's authority, snapshotting own `current_grants`.
    pub fn hold_delegation(
        &mut self,
        leave_taker_id: EmployeeId,
        current_grants: &GrantState,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.state != LifecycleState::Normal {
            return Err(AppError::InvalidTransition(format!(
                "delegate '{}' is {} and cannot cover leave",
                self.employee_id,
                self.state.as_str()
            )));
        }
        self.ensure_not_holding("cover another leave")?;

        self.delegation_hold = Some(DelegationHold {
            leave_taker_id,
            snapshot: StatusSnapshot {
                grants: current_grants.clone(),
                decision_status: self.decision_status,
                captured_at: now,
            },
        });
        Ok(())
    }

    /// Gives up authority held for `leave_taker_id`.
    ///
    /// Returns `None` when no such hold exists, so a repeated release is a no-op.
    pub fn release_delegation(&mut self, leave_taker_id: EmployeeId) -> Option<StatusSnapshot> {
        if self
            .delegation_hold
            .as_ref()
            .is_some_and(|hold| hold.leave_taker_id == leave_taker_id)
        {
            return self.delegation_hold.take().map(|hold| hold.snapshot);
        }

        None
    }

    /// Places a restriction and returns the grant state to apply.
    pub fn impose(
        &mut self,
        restriction: StatusRestriction,
        current_grants: &GrantState,
        now: DateTime<Utc>,
    ) -> AppResult<GrantState> {
        if self.state != LifecycleState::Normal {
            return Err(AppError::InvalidTransition(format!(
                "employee '{}' is {} and cannot enter {}",
                self.employee_id,
                self.state.as_str(),
                restriction.kind.as_str()
            )));
        }
        self.ensure_not_holding(restriction.kind.as_str())?;

        if restriction.reason.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "a reason is required for {}",
                restriction.kind.as_str()
            )));
        }

        if restriction
            .ends_at
            .is_some_and(|ends_at| ends_at <= restriction.starts_at)
        {
            return Err(AppError::Validation(format!(
                "{} must end after it starts",
                restriction.kind.as_str()
            )));
        }

        let next_grants = if restriction.kind.withdraws_role() {
            GrantState::cleared()
        } else {
            current_grants.clone()
        };

        self.snapshot = Some(StatusSnapshot {
            grants: current_grants.clone(),
            decision_status: self.decision_status,
            captured_at: now,
        });
        self.state = restriction.kind.state();
        self.decision_status = restriction.kind.decision_status();
        self.restriction = Some(restriction);
        Ok(next_grants)
    }

    /// Lifts the active restriction. Repeated calls are no-ops.
    pub fn restore(&mut self) -> AppResult<StatusRelease> {
        match self.state {
            LifecycleState::Suspended | LifecycleState::Blocked | LifecycleState::Terminated => {
                let snapshot = self.snapshot.take().ok_or_else(|| {
                    AppError::Internal(format!(
                        "restricted employee '{}' has no snapshot",
                        self.employee_id
                    ))
                })?;
                self.restriction = None;
                self.decision_status = DecisionStatus::Restored;
                self.state = LifecycleState::Normal;
                Ok(StatusRelease::Restored(snapshot))
            }
            LifecycleState::OnLeavePending | LifecycleState::OnLeaveAccepted => {
                Err(AppError::InvalidTransition(format!(
                    "employee '{}' is on leave; take the leave back instead",
                    self.employee_id
                )))
            }
            LifecycleState::Normal => Ok(StatusRelease::AlreadyRestored),
        }
    }

    /// Returns the restoration whose end date has passed at `now`.
    #[must_use]
    pub fn due_restoration(&self, now: DateTime<Utc>) -> Option<DueRestoration> {
        match self.state {
            LifecycleState::OnLeavePending | LifecycleState::OnLeaveAccepted => self
                .leave
                .as_ref()
                .filter(|leave| leave.window.ends_at() <= now)
                .map(|_| DueRestoration::LeaveExpired),
            LifecycleState::Suspended | LifecycleState::Blocked | LifecycleState::Terminated => {
                self.restriction
                    .as_ref()
                    .filter(|restriction| restriction.ends_at.is_some_and(|ends| ends <= now))
                    .map(|restriction| DueRestoration::RestrictionLapsed(restriction.kind))
            }
            LifecycleState::Normal => None,
        }
    }

    /// Returns the instant the sweep should next look at this record.
    #[must_use]
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            LifecycleState::OnLeavePending | LifecycleState::OnLeaveAccepted => {
                self.leave.as_ref().map(|leave| leave.window.ends_at())
            }
            LifecycleState::Suspended | LifecycleState::Blocked | LifecycleState::Terminated => {
                self.restriction.as_ref().and_then(|restriction| restriction.ends_at)
            }
            LifecycleState::Normal => None,
        }
    }

    fn ensure_not_holding(&self, attempted: &str) -> AppResult<()> {
        if let Some(hold) = &self.delegation_hold {
            return Err(AppError::InvalidTransition(format!(
                "employee '{}' holds delegated authority for '{}' and cannot {attempted}",
                self.employee_id, hold.leave_taker_id
            )));
        }

        Ok(())
    }
}
