use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use orgauth_application::{CreatePermissionInput, CreateRoleInput};
use orgauth_core::{ActorIdentity, PermissionId, RoleId};
use orgauth_domain::PermissionUpdate;

use crate::dto::{
    CreatePermissionRequest, CreateRoleRequest, PermissionResponse, RoleResponse,
    UpdatePermissionRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_id;

mod roles;

pub use roles::{
    create_role_handler, grant_role_permission_handler, list_roles_handler,
    revoke_role_permission_handler,
};

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .security_admin_service
        .list_permissions(&actor)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreatePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    let permission = state
        .security_admin_service
        .create_permission(&actor, CreatePermissionInput::try_from(payload)?)
        .await?;

    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

pub async fn update_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(permission_id): Path<String>,
    Json(payload): Json<UpdatePermissionRequest>,
) -> ApiResult<Json<PermissionResponse>> {
    let permission = state
        .security_admin_service
        .update_permission(
            &actor,
            parse_id::<PermissionId>(permission_id.as_str())?,
            PermissionUpdate::try_from(payload)?,
        )
        .await?;

    Ok(Json(PermissionResponse::from(permission)))
}

pub async fn delete_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(permission_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .delete_permission(&actor, parse_id::<PermissionId>(permission_id.as_str())?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
