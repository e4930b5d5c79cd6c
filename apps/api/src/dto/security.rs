use std::str::FromStr;

use orgauth_application::CreatePermissionInput;
use orgauth_core::AppError;
use orgauth_domain::{ActionType, DepartmentCode, HierarchyScope, PermissionUpdate, Role, StatusScope};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for permission creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-permission-request.ts"
)]
pub struct CreatePermissionRequest {
    pub action: String,
    #[ts(type = "\"ADMINISTRATIVE\" | \"FUNCTIONAL\" | \"INFORMATIONAL\"")]
    pub action_type: String,
    #[ts(type = "\"SELF\" | \"DESCENDANT\" | \"DEPARTMENT\" | \"ORGANIZATION\"")]
    pub hierarchy_scope: String,
    #[serde(default)]
    pub status_scope: Vec<String>,
    pub resource_type: String,
    #[serde(default)]
    pub bypass_hierarchy: bool,
}

impl TryFrom<CreatePermissionRequest> for CreatePermissionInput {
    type Error = AppError;

    fn try_from(value: CreatePermissionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            action: value.action,
            action_type: ActionType::from_str(value.action_type.as_str())?,
            hierarchy_scope: HierarchyScope::from_str(value.hierarchy_scope.as_str())?,
            status_scope: parse_departments(&value.status_scope)?,
            resource_type: value.resource_type,
            bypass_hierarchy: value.bypass_hierarchy,
        })
    }
}

/// Incoming payload for permission updates; absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-permission-request.ts"
)]
pub struct UpdatePermissionRequest {
    pub action: Option<String>,
    pub action_type: Option<String>,
    pub hierarchy_scope: Option<String>,
    pub status_scope: Option<Vec<String>>,
    pub bypass_hierarchy: Option<bool>,
}

impl TryFrom<UpdatePermissionRequest> for PermissionUpdate {
    type Error = AppError;

    fn try_from(value: UpdatePermissionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            action: value.action,
            action_type: value
                .action_type
                .as_deref()
                .map(ActionType::from_str)
                .transpose()?,
            hierarchy_scope: value
                .hierarchy_scope
                .as_deref()
                .map(HierarchyScope::from_str)
                .transpose()?,
            status_scope: value
                .status_scope
                .as_deref()
                .map(parse_departments)
                .transpose()?
                .map(StatusScope::new),
            bypass_hierarchy: value.bypass_hierarchy,
        })
    }
}

fn parse_departments(values: &[String]) -> Result<Vec<DepartmentCode>, AppError> {
    values
        .iter()
        .map(|value| DepartmentCode::from_str(value.as_str()))
        .collect()
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub permission_ids: Vec<String>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub category: String,
    pub permission_ids: Vec<String>,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.id().to_string(),
            name: value.name().to_owned(),
            category: value.category().to_owned(),
            permission_ids: value
                .permission_ids()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use orgauth_application::CreatePermissionInput;
    use orgauth_domain::{ActionType, DepartmentCode, PermissionUpdate};

    use super::{CreatePermissionRequest, UpdatePermissionRequest};

    #[test]
    fn create_request_parses_enumerations() {
        let input = CreatePermissionInput::try_from(CreatePermissionRequest {
            action: "payroll.approve".to_owned(),
            action_type: "FUNCTIONAL".to_owned(),
            hierarchy_scope: "DEPARTMENT".to_owned(),
            status_scope: vec!["FINANCE".to_owned(), "HR".to_owned()],
            resource_type: "payroll".to_owned(),
            bypass_hierarchy: false,
        });
        assert!(input.is_ok());
        let input = input.unwrap_or_else(|_| unreachable!());

        assert_eq!(input.action_type, ActionType::Functional);
        assert_eq!(
            input.status_scope,
            vec![DepartmentCode::Finance, DepartmentCode::HumanResources]
        );
    }

    #[test]
    fn unknown_action_type_is_a_validation_error() {
        let result = CreatePermissionInput::try_from(CreatePermissionRequest {
            action: "payroll.approve".to_owned(),
            action_type: "SUPERVISORY".to_owned(),
            hierarchy_scope: "DEPARTMENT".to_owned(),
            status_scope: Vec::new(),
            resource_type: "payroll".to_owned(),
            bypass_hierarchy: false,
        });
        assert!(result.is_err());
    }

    #[test]
    fn empty_update_changes_nothing() {
        let update = PermissionUpdate::try_from(UpdatePermissionRequest::default());
        assert!(update.is_ok());
        let update = update.unwrap_or_else(|_| unreachable!());
        assert!(update.action.is_none());
        assert!(update.status_scope.is_none());
    }
}
