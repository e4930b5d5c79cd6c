//! Authorization vocabulary shared by the guards and their callers.

use serde::{Deserialize, Serialize};

use crate::DepartmentCode;

/// Fixed reason vocabulary attached to every verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Self-action with a self-scoped permission.
    SelfActionAllowed,
    /// Actor is senior to, aligned with and above the target.
    AdministrativeAllowed,
    /// Permission or override carries the bypass flag.
    HierarchyBypassed,
    /// Organization-wide actor performing a functional action.
    ExecutiveAccess,
    /// Functional action within the actor's department.
    FunctionalAllowed,
    /// Read-only action gated by permission possession alone.
    InformationalAllowed,
    /// Department Guard admitted the request.
    DepartmentAllowed,
    /// Actor lacks the required permission.
    NoPermission,
    /// Actor or target has no active assignment.
    NoAssignment,
    /// An assignment points at a missing org node.
    NoOrgunit,
    /// Actor targeted themselves with a non-self permission.
    SelfActionDenied,
    /// Actor is not strictly senior to the target.
    HierarchyLevelViolation,
    /// Administrative action across departments.
    DepartmentViolation,
    /// Target lies outside the actor's subtree.
    SubtreeViolation,
    /// Functional action across departments.
    FunctionalDepartmentMismatch,
    /// Request addressed another department's data.
    CrossDepartmentDenied,
}

impl ReasonCode {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfActionAllowed => "SELF_ACTION_ALLOWED",
            Self::AdministrativeAllowed => "ADMINISTRATIVE_ALLOWED",
            Self::HierarchyBypassed => "HIERARCHY_BYPASSED",
            Self::ExecutiveAccess => "EXECUTIVE_ACCESS",
            Self::FunctionalAllowed => "FUNCTIONAL_ALLOWED",
            Self::InformationalAllowed => "INFORMATIONAL_ALLOWED",
            Self::DepartmentAllowed => "DEPARTMENT_ALLOWED",
            Self::NoPermission => "NO_PERMISSION",
            Self::NoAssignment => "NO_ASSIGNMENT",
            Self::NoOrgunit => "NO_ORGUNIT",
            Self::SelfActionDenied => "SELF_ACTION_DENIED",
            Self::HierarchyLevelViolation => "HIERARCHY_LEVEL_VIOLATION",
            Self::DepartmentViolation => "DEPARTMENT_VIOLATION",
            Self::SubtreeViolation => "SUBTREE_VIOLATION",
            Self::FunctionalDepartmentMismatch => "FUNCTIONAL_DEPARTMENT_MISMATCH",
            Self::CrossDepartmentDenied => "CROSS_DEPARTMENT_DENIED",
        }
    }

    /// Returns whether a denial with this code points at broken configuration
    /// rather than an ordinary lack of authority.
    #[must_use]
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::NoOrgunit)
    }
}

/// Step at which an evaluation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStep {
    /// Effective permission lookup.
    PermissionExistence,
    /// Actor and target assignment and org node resolution.
    AssignmentResolution,
    /// Actor acting on themselves.
    SelfAction,
    /// Administrative seniority check.
    HierarchyLevel,
    /// Administrative department check.
    DepartmentAlignment,
    /// Administrative subtree containment check.
    SubtreeContainment,
    /// Functional action evaluation.
    Functional,
    /// Informational action evaluation.
    Informational,
    /// Request-level department isolation.
    DepartmentIsolation,
}

impl DecisionStep {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionExistence => "permission_existence",
            Self::AssignmentResolution => "assignment_resolution",
            Self::SelfAction => "self_action",
            Self::HierarchyLevel => "hierarchy_level",
            Self::DepartmentAlignment => "department_alignment",
            Self::SubtreeContainment => "subtree_containment",
            Self::Functional => "functional",
            Self::Informational => "informational",
            Self::DepartmentIsolation => "department_isolation",
        }
    }
}

/// Structured allow or deny outcome. Denials are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationVerdict {
    allowed: bool,
    reason: ReasonCode,
    step: DecisionStep,
    details: String,
}

impl AuthorizationVerdict {
    /// Creates an allow verdict.
    #[must_use]
    pub fn allow(reason: ReasonCode, step: DecisionStep, details: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason,
            step,
            details: details.into(),
        }
    }

    /// Creates a deny verdict.
    #[must_use]
    pub fn deny(reason: ReasonCode, step: DecisionStep, details: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason,
            step,
            details: details.into(),
        }
    }

    /// Returns whether the action may proceed.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the reason code.
    #[must_use]
    pub fn reason(&self) -> ReasonCode {
        self.reason
    }

    /// Returns the step at which evaluation stopped.
    #[must_use]
    pub fn step(&self) -> DecisionStep {
        self.step
    }

    /// Returns human-readable context.
    #[must_use]
    pub fn details(&self) -> &str {
        self.details.as_str()
    }
}

/// Department visibility attached to a request after isolation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "department", rename_all = "snake_case")]
pub enum DepartmentScope {
    /// Organization-wide actor.
    Unrestricted,
    /// Actor confined to one department.
    Restricted(DepartmentCode),
}

impl DepartmentScope {
    /// Returns the scope for an actor placed in `department`.
    #[must_use]
    pub fn for_department(department: DepartmentCode) -> Self {
        if department.is_wildcard() {
            Self::Unrestricted
        } else {
            Self::Restricted(department)
        }
    }

    /// Returns the department listings must be narrowed to, if any.
    #[must_use]
    pub fn narrowed_to(&self) -> Option<DepartmentCode> {
        match self {
            Self::Unrestricted => None,
            Self::Restricted(department) => Some(*department),
        }
    }

    /// Returns whether data in `department` is visible in this scope.
    #[must_use]
    pub fn admits(&self, department: DepartmentCode) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Restricted(own) => *own == department,
        }
    }
}
