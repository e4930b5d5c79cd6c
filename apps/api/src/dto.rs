mod assignments;
mod authorization;
mod common;
mod lifecycle;
mod org;
mod security;

pub use assignments::{
    AssignmentListParams, AssignmentResponse, PermissionOverrideDto, PlaceEmployeeRequest,
    SetOverridesRequest,
};
pub(crate) use assignments::parse_overrides;
pub use authorization::{
    AuthorizeRequest, AuthorizeResponse, EffectivePermissionsResponse, PermissionResponse,
};
pub use common::HealthResponse;
pub use lifecycle::{
    AcceptLeaveRequest, ApplyLeaveRequest, LeaveReleaseResponse, LifecycleResponse,
    RejectLeaveRequest, RestrictionRequest, StatusReleaseResponse,
};
pub use org::{CreateOrgNodeRequest, OrgNodeResponse, ReparentOrgNodeRequest};
pub use security::{
    CreatePermissionRequest, CreateRoleRequest, RoleResponse, UpdatePermissionRequest,
};
