use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgauth_core::{AppResult, AssignmentId, EmployeeId};
use orgauth_domain::{EmployeeLifecycle, GrantState};

/// Grant state written to an active assignment as part of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantUpdate {
    /// Target assignment; must still be active.
    pub assignment_id: AssignmentId,
    /// New grant state.
    pub grants: GrantState,
}

/// Lifecycle records and grant changes applied as one unit.
///
/// Each record carries the version it was read at; `0` means not yet stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleCommit {
    /// Lifecycle records to write.
    pub records: Vec<EmployeeLifecycle>,
    /// Assignment grant changes to write.
    pub grants: Vec<GrantUpdate>,
}

/// Repository port for lifecycle state.
#[async_trait]
pub trait LifecycleRepository: Send + Sync {
    /// Loads an employee's lifecycle record.
    async fn find(&self, employee_id: EmployeeId) -> AppResult<Option<EmployeeLifecycle>>;

    /// Applies every change in `commit` or none of them.
    ///
    /// A record whose stored version differs from the one it carries fails the
    /// whole commit with `Conflict`.
    async fn commit(&self, commit: LifecycleCommit) -> AppResult<()>;

    /// Lists records with an end date at or before `now`.
    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<EmployeeLifecycle>>;

    /// Lists records currently on accepted leave.
    async fn list_on_accepted_leave(&self) -> AppResult<Vec<EmployeeLifecycle>>;
}
