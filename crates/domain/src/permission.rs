use std::collections::BTreeSet;
use std::str::FromStr;

use orgauth_core::{AppError, AppResult, NonEmptyString, PermissionId};
use serde::{Deserialize, Serialize};

use crate::DepartmentCode;

/// Authorization tier of a permission.
///
/// The tier decides which checks the hierarchy guard runs after the actor is
/// known to hold the permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Changes someone's standing; requires formal seniority and containment.
    Administrative,
    /// Day-to-day work; requires department alignment only.
    Functional,
    /// Read-only; gated by possession of the permission alone.
    Informational,
}

impl ActionType {
    /// Returns a stable storage value for this action type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrative => "ADMINISTRATIVE",
            Self::Functional => "FUNCTIONAL",
            Self::Informational => "INFORMATIONAL",
        }
    }
}

impl FromStr for ActionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADMINISTRATIVE" => Ok(Self::Administrative),
            "FUNCTIONAL" => Ok(Self::Functional),
            "INFORMATIONAL" => Ok(Self::Informational),
            _ => Err(AppError::Validation(format!(
                "unknown action type '{value}'"
            ))),
        }
    }
}

/// Reach of a permission within the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HierarchyScope {
    /// Only the holder themselves.
    #[serde(rename = "SELF")]
    OwnRecord,
    /// The holder's descendants.
    Descendant,
    /// The holder's department.
    Department,
    /// The whole organization.
    Organization,
}

impl HierarchyScope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnRecord => "SELF",
            Self::Descendant => "DESCENDANT",
            Self::Department => "DEPARTMENT",
            Self::Organization => "ORGANIZATION",
        }
    }
}

impl FromStr for HierarchyScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SELF" => Ok(Self::OwnRecord),
            "DESCENDANT" => Ok(Self::Descendant),
            "DEPARTMENT" => Ok(Self::Department),
            "ORGANIZATION" => Ok(Self::Organization),
            _ => Err(AppError::Validation(format!(
                "unknown hierarchy scope '{value}'"
            ))),
        }
    }
}

/// How a permission with an empty department scope is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyStatusScopePolicy {
    /// An empty scope applies to every department.
    #[default]
    FailOpen,
    /// An empty scope applies only to organization-wide actors.
    FailClosed,
}

impl EmptyStatusScopePolicy {
    /// Returns a stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::FailClosed => "fail_closed",
        }
    }
}

impl FromStr for EmptyStatusScopePolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "fail_open" => Ok(Self::FailOpen),
            "fail_closed" => Ok(Self::FailClosed),
            _ => Err(AppError::Validation(format!(
                "empty status scope policy must be 'fail_open' or 'fail_closed', got '{value}'"
            ))),
        }
    }
}

/// Departments a permission is meaningful for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusScope(BTreeSet<DepartmentCode>);

impl StatusScope {
    /// Creates a scope from a set of departments.
    #[must_use]
    pub fn new(departments: impl IntoIterator<Item = DepartmentCode>) -> Self {
        Self(departments.into_iter().collect())
    }

    /// Creates a scope covering every department.
    #[must_use]
    pub fn everywhere() -> Self {
        Self::new([DepartmentCode::All])
    }

    /// Returns the departments in the scope.
    pub fn departments(&self) -> impl Iterator<Item = DepartmentCode> + '_ {
        self.0.iter().copied()
    }

    /// Returns whether the scope lists no department.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether a permission with this scope survives the department
    /// filter for an actor in `department`.
    #[must_use]
    pub fn admits(&self, department: DepartmentCode, policy: EmptyStatusScopePolicy) -> bool {
        if department.is_wildcard() {
            return true;
        }

        if self.0.is_empty() {
            return policy == EmptyStatusScopePolicy::FailOpen;
        }

        self.0.contains(&department) || self.0.contains(&DepartmentCode::All)
    }
}

/// Atomic capability that roles and overrides grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    id: PermissionId,
    action: NonEmptyString,
    action_type: ActionType,
    hierarchy_scope: HierarchyScope,
    status_scope: StatusScope,
    resource_type: NonEmptyString,
    is_system: bool,
    bypass_hierarchy: bool,
}

impl PermissionDefinition {
    /// Creates a validated permission definition.
    pub fn new(
        id: PermissionId,
        action: impl Into<String>,
        action_type: ActionType,
        hierarchy_scope: HierarchyScope,
        status_scope: StatusScope,
        resource_type: impl Into<String>,
    ) -> AppResult<Self> {
        let action = NonEmptyString::new(action)?;
        if action.as_str().chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "permission action '{}' must not contain whitespace",
                action.as_str()
            )));
        }

        Ok(Self {
            id,
            action,
            action_type,
            hierarchy_scope,
            status_scope,
            resource_type: NonEmptyString::new(resource_type)?,
            is_system: false,
            bypass_hierarchy: false,
        })
    }

    /// Marks the permission as system-managed.
    #[must_use]
    pub fn into_system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Sets whether functional checks skip department alignment.
    #[must_use]
    pub fn with_bypass_hierarchy(mut self, bypass_hierarchy: bool) -> Self {
        self.bypass_hierarchy = bypass_hierarchy;
        self
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the action name, e.g. `employee.suspend`.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the authorization tier.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    /// Returns the hierarchy scope.
    #[must_use]
    pub fn hierarchy_scope(&self) -> HierarchyScope {
        self.hierarchy_scope
    }

    /// Returns the department scope.
    #[must_use]
    pub fn status_scope(&self) -> &StatusScope {
        &self.status_scope
    }

    /// Returns the resource type this permission governs.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.resource_type.as_str()
    }

    /// Returns whether the permission is system-managed.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns whether functional checks are bypassed.
    #[must_use]
    pub fn bypass_hierarchy(&self) -> bool {
        self.bypass_hierarchy
    }

    /// Applies an administrative edit.
    ///
    /// System permissions keep their action name.
    pub fn apply_update(&mut self, update: PermissionUpdate) -> AppResult<()> {
        if let Some(action) = update.action {
            if self.is_system && action != self.action.as_str() {
                return Err(AppError::Forbidden(format!(
                    "system permission '{}' cannot be renamed",
                    self.action.as_str()
                )));
            }
            self.action = NonEmptyString::new(action)?;
        }
        if let Some(action_type) = update.action_type {
            self.action_type = action_type;
        }
        if let Some(hierarchy_scope) = update.hierarchy_scope {
            self.hierarchy_scope = hierarchy_scope;
        }
        if let Some(status_scope) = update.status_scope {
            self.status_scope = status_scope;
        }
        if let Some(bypass_hierarchy) = update.bypass_hierarchy {
            self.bypass_hierarchy = bypass_hierarchy;
        }

        Ok(())
    }
}

/// Partial edit of a permission definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionUpdate {
    /// New action name.
    pub action: Option<String>,
    /// New tier.
    pub action_type: Option<ActionType>,
    /// New hierarchy scope.
    pub hierarchy_scope: Option<HierarchyScope>,
    /// New department scope.
    pub status_scope: Option<StatusScope>,
    /// New bypass flag.
    pub bypass_hierarchy: Option<bool>,
}

/// Per-assignment permission grant layered on top of the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionOverride {
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Assignment-local bypass flag for functional checks.
    pub bypass_hierarchy: bool,
}

impl PermissionOverride {
    /// Creates an override without bypass.
    #[must_use]
    pub fn grant(permission_id: PermissionId) -> Self {
        Self {
            permission_id,
            bypass_hierarchy: false,
        }
    }
}

/// Action names the engine itself checks before privileged mutations.
pub mod actions {
    /// Approve or reject another employee's leave.
    pub const LEAVE_APPROVE: &str = "leave.approve";
    /// Request leave for oneself.
    pub const LEAVE_APPLY: &str = "leave.apply";
    /// Suspend an employee.
    pub const EMPLOYEE_SUSPEND: &str = "employee.suspend";
    /// Block an employee.
    pub const EMPLOYEE_BLOCK: &str = "employee.block";
    /// Terminate an employee.
    pub const EMPLOYEE_TERMINATE: &str = "employee.terminate";
    /// Restore a suspended, blocked or terminated employee.
    pub const EMPLOYEE_RESTORE: &str = "employee.restore";
    /// Place an employee on a role and org node.
    pub const EMPLOYEE_PLACE: &str = "employee.place";
    /// Read another employee's effective permissions.
    pub const PERMISSION_READ: &str = "permission.read";
    /// Manage roles, permissions and overrides.
    pub const SECURITY_ROLE_MANAGE: &str = "security.role.manage";
    /// Manage the org tree.
    pub const ORG_STRUCTURE_MANAGE: &str = "org.structure.manage";
}
