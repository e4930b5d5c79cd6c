//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod audit;
mod authorization;
mod department;
mod lifecycle;
mod org_tree;
mod permission;
mod role;

pub use assignment::{Assignment, GrantState};
pub use audit::AuditAction;
pub use authorization::{AuthorizationVerdict, DecisionStep, DepartmentScope, ReasonCode};
pub use department::DepartmentCode;
pub use lifecycle::{
    DecisionStatus, DelegationHold, DelegationRecord, DueRestoration, EmployeeLifecycle,
    LeaveRelease, LeaveWindow, LifecycleState, RestrictionKind, StatusRelease, StatusRestriction,
    StatusSnapshot,
};
pub use org_tree::{NodeRelation, OrgNode, OrgPath, OrgTree, PATH_SEPARATOR};
pub use permission::{
    ActionType, EmptyStatusScopePolicy, HierarchyScope, PermissionDefinition, PermissionOverride,
    PermissionUpdate, StatusScope, actions,
};
pub use role::Role;
