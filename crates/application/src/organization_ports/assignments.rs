use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgauth_core::{AppResult, AssignmentId, EmployeeId, OrgNodeId};
use orgauth_domain::{Assignment, DepartmentCode, GrantState};

/// Query parameters for assignment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentListQuery {
    /// Department filter; `None` lists every department.
    pub department: Option<DepartmentCode>,
    /// Org node filter.
    pub org_node_id: Option<OrgNodeId>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

impl Default for AssignmentListQuery {
    fn default() -> Self {
        Self {
            department: None,
            org_node_id: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Repository port for employee placements.
///
/// Implementations enforce at most one active assignment per employee.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Returns the employee's active assignment.
    async fn find_active(&self, employee_id: EmployeeId) -> AppResult<Option<Assignment>>;

    /// Lists active assignments placed on any of `node_ids`.
    async fn list_active_at_nodes(&self, node_ids: &[OrgNodeId]) -> AppResult<Vec<Assignment>>;

    /// Lists active assignments matching `query`.
    async fn list_active(&self, query: AssignmentListQuery) -> AppResult<Vec<Assignment>>;

    /// Deactivates the prior active assignment and activates `assignment`
    /// atomically, returning the deactivated one.
    ///
    /// A concurrent placement of the same employee surfaces as `Conflict`.
    async fn replace_active(&self, assignment: Assignment) -> AppResult<Option<Assignment>>;

    /// Sets `is_active = false` and stamps `effective_until`.
    async fn deactivate(&self, assignment_id: AssignmentId, at: DateTime<Utc>) -> AppResult<()>;

    /// Replaces the grant state of an active assignment.
    async fn update_grants(&self, assignment_id: AssignmentId, grants: GrantState)
    -> AppResult<()>;
}
