use std::str::FromStr;

use orgauth_application::AssignmentListQuery;
use orgauth_core::{AppError, OrgNodeId, PermissionId};
use orgauth_domain::{Assignment, DepartmentCode, PermissionOverride};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Query string accepted by the assignment listing.
#[derive(Debug, Default, Deserialize)]
pub struct AssignmentListParams {
    pub department: Option<String>,
    pub org_node_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TryFrom<AssignmentListParams> for AssignmentListQuery {
    type Error = AppError;

    fn try_from(value: AssignmentListParams) -> Result<Self, Self::Error> {
        let defaults = Self::default();

        Ok(Self {
            department: value
                .department
                .as_deref()
                .map(DepartmentCode::from_str)
                .transpose()?,
            org_node_id: value
                .org_node_id
                .as_deref()
                .map(OrgNodeId::from_str)
                .transpose()?,
            limit: value.limit.unwrap_or(defaults.limit),
            offset: value.offset.unwrap_or(defaults.offset),
        })
    }
}

/// Per-assignment permission override.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-override.ts"
)]
pub struct PermissionOverrideDto {
    pub permission_id: String,
    #[serde(default)]
    pub bypass_hierarchy: bool,
}

impl From<PermissionOverride> for PermissionOverrideDto {
    fn from(value: PermissionOverride) -> Self {
        Self {
            permission_id: value.permission_id.to_string(),
            bypass_hierarchy: value.bypass_hierarchy,
        }
    }
}

impl TryFrom<PermissionOverrideDto> for PermissionOverride {
    type Error = AppError;

    fn try_from(value: PermissionOverrideDto) -> Result<Self, Self::Error> {
        Ok(Self {
            permission_id: PermissionId::from_str(value.permission_id.as_str())?,
            bypass_hierarchy: value.bypass_hierarchy,
        })
    }
}

/// Converts wire overrides, rejecting the first malformed identifier.
pub(crate) fn parse_overrides(
    overrides: Vec<PermissionOverrideDto>,
) -> Result<Vec<PermissionOverride>, AppError> {
    overrides
        .into_iter()
        .map(PermissionOverride::try_from)
        .collect()
}

/// Incoming payload for placing an employee.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/place-employee-request.ts"
)]
pub struct PlaceEmployeeRequest {
    pub role_id: String,
    pub org_node_id: String,
    pub department: String,
    #[serde(default)]
    pub overrides: Vec<PermissionOverrideDto>,
}

/// Incoming payload replacing an assignment's overrides.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-overrides-request.ts"
)]
pub struct SetOverridesRequest {
    pub overrides: Vec<PermissionOverrideDto>,
}

/// API representation of an assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assignment-response.ts"
)]
pub struct AssignmentResponse {
    pub assignment_id: String,
    pub employee_id: String,
    pub role_id: Option<String>,
    pub org_node_id: String,
    pub department: String,
    pub overrides: Vec<PermissionOverrideDto>,
    pub is_active: bool,
    pub effective_from: String,
    pub effective_until: Option<String>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(value: Assignment) -> Self {
        Self {
            assignment_id: value.id().to_string(),
            employee_id: value.employee_id().to_string(),
            role_id: value.role_id().map(|role_id| role_id.to_string()),
            org_node_id: value.org_node_id().to_string(),
            department: value.department().as_str().to_owned(),
            overrides: value
                .permission_overrides()
                .iter()
                .copied()
                .map(PermissionOverrideDto::from)
                .collect(),
            is_active: value.is_active(),
            effective_from: value.effective_from().to_rfc3339(),
            effective_until: value.effective_until().map(|until| until.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use orgauth_application::AssignmentListQuery;

    use super::{AssignmentListParams, PermissionOverrideDto, parse_overrides};

    #[test]
    fn list_params_keep_default_paging() {
        let query = AssignmentListQuery::try_from(AssignmentListParams {
            department: Some("finance".to_owned()),
            ..AssignmentListParams::default()
        });
        assert!(query.is_ok());
        let query = query.unwrap_or_else(|_| unreachable!());

        assert_eq!(query.department.map(|value| value.as_str()), Some("FINANCE"));
        assert_eq!(query.limit, AssignmentListQuery::default().limit);
    }

    #[test]
    fn malformed_override_id_is_rejected() {
        let result = parse_overrides(vec![PermissionOverrideDto {
            permission_id: "not-a-uuid".to_owned(),
            bypass_hierarchy: false,
        }]);
        assert!(result.is_err());
    }
}
