use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A leave request was recorded.
    LeaveApplied,
    /// A leave was accepted and authority delegated.
    LeaveAccepted,
    /// A leave request was rejected.
    LeaveRejected,
    /// A leave ended and delegated authority returned.
    LeaveTakenBack,
    /// A pending leave was withdrawn.
    LeaveWithdrawn,
    /// An employee was suspended.
    EmployeeSuspended,
    /// An employee was blocked.
    EmployeeBlocked,
    /// An employee was terminated.
    EmployeeTerminated,
    /// A restriction was lifted.
    EmployeeRestored,
    /// An employee was placed at a position.
    AssignmentPlaced,
    /// An employee's active assignment was removed.
    AssignmentRemoved,
    /// An assignment's overrides were replaced.
    AssignmentOverridesChanged,
    /// A permission definition was created.
    PermissionCreated,
    /// A permission definition was updated.
    PermissionUpdated,
    /// A permission definition was deleted.
    PermissionDeleted,
    /// A role was created.
    RoleCreated,
    /// A permission was added to a role.
    RolePermissionGranted,
    /// A permission was removed from a role.
    RolePermissionRevoked,
    /// An org node was created.
    OrgNodeCreated,
    /// An org node subtree moved under a new parent.
    OrgNodeReparented,
    /// An org node was deactivated.
    OrgNodeDeactivated,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeaveApplied => "lifecycle.leave.applied",
            Self::LeaveAccepted => "lifecycle.leave.accepted",
            Self::LeaveRejected => "lifecycle.leave.rejected",
            Self::LeaveTakenBack => "lifecycle.leave.taken_back",
            Self::LeaveWithdrawn => "lifecycle.leave.withdrawn",
            Self::EmployeeSuspended => "lifecycle.employee.suspended",
            Self::EmployeeBlocked => "lifecycle.employee.blocked",
            Self::EmployeeTerminated => "lifecycle.employee.terminated",
            Self::EmployeeRestored => "lifecycle.employee.restored",
            Self::AssignmentPlaced => "assignment.placed",
            Self::AssignmentRemoved => "assignment.removed",
            Self::AssignmentOverridesChanged => "assignment.overrides.changed",
            Self::PermissionCreated => "security.permission.created",
            Self::PermissionUpdated => "security.permission.updated",
            Self::PermissionDeleted => "security.permission.deleted",
            Self::RoleCreated => "security.role.created",
            Self::RolePermissionGranted => "security.role.permission_granted",
            Self::RolePermissionRevoked => "security.role.permission_revoked",
            Self::OrgNodeCreated => "org.node.created",
            Self::OrgNodeReparented => "org.node.reparented",
            Self::OrgNodeDeactivated => "org.node.deactivated",
        }
    }

    /// Returns the area the action belongs to.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::LeaveApplied
            | Self::LeaveAccepted
            | Self::LeaveRejected
            | Self::LeaveTakenBack
            | Self::LeaveWithdrawn
            | Self::EmployeeSuspended
            | Self::EmployeeBlocked
            | Self::EmployeeTerminated
            | Self::EmployeeRestored => "lifecycle",
            Self::AssignmentPlaced
            | Self::AssignmentRemoved
            | Self::AssignmentOverridesChanged => "assignment",
            Self::PermissionCreated
            | Self::PermissionUpdated
            | Self::PermissionDeleted
            | Self::RoleCreated
            | Self::RolePermissionGranted
            | Self::RolePermissionRevoked => "security",
            Self::OrgNodeCreated | Self::OrgNodeReparented | Self::OrgNodeDeactivated => "org",
        }
    }
}
