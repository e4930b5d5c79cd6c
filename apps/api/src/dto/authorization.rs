use orgauth_application::EffectivePermissions;
use orgauth_domain::{AuthorizationVerdict, PermissionDefinition};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::PermissionOverrideDto;

/// Incoming payload for an authorization check.
///
/// `actor_id` defaults to the calling employee.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/authorize-request.ts"
)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub actor_id: Option<String>,
    pub target_id: String,
    pub action: String,
}

/// Authorization verdict with the HTTP-like status category of its reason.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/authorize-response.ts"
)]
pub struct AuthorizeResponse {
    pub allowed: bool,
    pub reason_code: String,
    pub step: String,
    pub details: String,
    pub status_category: u16,
}

impl From<AuthorizationVerdict> for AuthorizeResponse {
    fn from(value: AuthorizationVerdict) -> Self {
        let status_category = if value.allowed() {
            200
        } else if value.reason().is_misconfiguration() {
            500
        } else {
            403
        };

        Self {
            allowed: value.allowed(),
            reason_code: value.reason().as_str().to_owned(),
            step: value.step().as_str().to_owned(),
            details: value.details().to_owned(),
            status_category,
        }
    }
}

/// API representation of a permission definition.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub action: String,
    pub action_type: String,
    pub hierarchy_scope: String,
    pub status_scope: Vec<String>,
    pub resource_type: String,
    pub is_system: bool,
    pub bypass_hierarchy: bool,
}

impl From<PermissionDefinition> for PermissionResponse {
    fn from(value: PermissionDefinition) -> Self {
        Self {
            permission_id: value.id().to_string(),
            action: value.action().to_owned(),
            action_type: value.action_type().as_str().to_owned(),
            hierarchy_scope: value.hierarchy_scope().as_str().to_owned(),
            status_scope: value
                .status_scope()
                .departments()
                .map(|department| department.as_str().to_owned())
                .collect(),
            resource_type: value.resource_type().to_owned(),
            is_system: value.is_system(),
            bypass_hierarchy: value.bypass_hierarchy(),
        }
    }
}

/// Direct, inherited and effective permissions of one employee.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub employee_id: String,
    pub org_node_id: Option<String>,
    pub department_code: Option<String>,
    pub is_executive: bool,
    pub direct: Vec<PermissionResponse>,
    pub inherited: Vec<PermissionResponse>,
    pub effective: Vec<PermissionResponse>,
    pub overrides: Vec<PermissionOverrideDto>,
}

impl From<EffectivePermissions> for EffectivePermissionsResponse {
    fn from(value: EffectivePermissions) -> Self {
        Self {
            employee_id: value.employee_id.to_string(),
            org_node_id: value.org_node_id.map(|node_id| node_id.to_string()),
            department_code: value
                .department
                .map(|department| department.as_str().to_owned()),
            is_executive: value.is_executive,
            direct: value.direct.into_iter().map(PermissionResponse::from).collect(),
            inherited: value
                .inherited
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
            effective: value
                .effective
                .into_iter()
                .map(PermissionResponse::from)
                .collect(),
            overrides: value
                .overrides
                .into_iter()
                .map(PermissionOverrideDto::from)
                .collect(),
        }
    }
}
