use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .security_admin_service
        .list_roles(&actor)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let permission_ids = payload
        .permission_ids
        .iter()
        .map(|value| parse_id::<PermissionId>(value.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let role = state
        .security_admin_service
        .create_role(
            &actor,
            CreateRoleInput {
                name: payload.name,
                category: payload.category,
                permission_ids,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn grant_role_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .security_admin_service
        .grant_permission_to_role(
            &actor,
            parse_id::<RoleId>(role_id.as_str())?,
            parse_id::<PermissionId>(permission_id.as_str())?,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn revoke_role_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .security_admin_service
        .revoke_permission_from_role(
            &actor,
            parse_id::<RoleId>(role_id.as_str())?,
            parse_id::<PermissionId>(permission_id.as_str())?,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}
