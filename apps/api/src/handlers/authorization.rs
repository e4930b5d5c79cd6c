use axum::Json;
use axum::extract::{Extension, Path, State};
use orgauth_core::{ActorIdentity, EmployeeId};
use orgauth_domain::actions;

use crate::dto::{AuthorizeRequest, AuthorizeResponse, EffectivePermissionsResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_id;

/// Evaluates the hierarchy guard. Denials are answered with `200` and a
/// verdict; only infrastructure failures become error responses.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let actor_id = match payload.actor_id.as_deref() {
        Some(value) => parse_id::<EmployeeId>(value)?,
        None => actor.employee_id(),
    };
    if actor_id != actor.employee_id() {
        state
            .hierarchy_guard
            .require_permission(actor.employee_id(), actions::PERMISSION_READ)
            .await?;
    }
    let target_id = parse_id::<EmployeeId>(payload.target_id.as_str())?;

    let verdict = state
        .hierarchy_guard
        .can_perform_action(actor_id, target_id, payload.action.as_str())
        .await?;

    Ok(Json(AuthorizeResponse::from(verdict)))
}

pub async fn effective_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let employee_id = parse_id::<EmployeeId>(employee_id.as_str())?;
    if employee_id != actor.employee_id() {
        state
            .hierarchy_guard
            .require_action(actor.employee_id(), employee_id, actions::PERMISSION_READ)
            .await?;
    }

    let permissions = state
        .hierarchy_guard
        .aggregator()
        .effective_permissions(employee_id)
        .await?;

    Ok(Json(EffectivePermissionsResponse::from(permissions)))
}
