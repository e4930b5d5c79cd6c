use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use orgauth_application::{ApplyLeaveInput, RestrictionInput};
use orgauth_core::{ActorIdentity, EmployeeId};

use crate::dto::{
    AcceptLeaveRequest, ApplyLeaveRequest, LeaveReleaseResponse, LifecycleResponse,
    RejectLeaveRequest, RestrictionRequest, StatusReleaseResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_id;

pub async fn lifecycle_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<LifecycleResponse>> {
    let lifecycle = state
        .lifecycle_service
        .lifecycle_for(&actor, parse_id::<EmployeeId>(employee_id.as_str())?)
        .await?;

    Ok(Json(LifecycleResponse::from(lifecycle)))
}

pub async fn apply_leave_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<ApplyLeaveRequest>,
) -> ApiResult<(StatusCode, Json<LifecycleResponse>)> {
    let lifecycle = state
        .lifecycle_service
        .apply_leave(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            ApplyLeaveInput::from(payload),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(LifecycleResponse::from(lifecycle))))
}

pub async fn accept_leave_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<AcceptLeaveRequest>,
) -> ApiResult<Json<LifecycleResponse>> {
    let lifecycle = state
        .lifecycle_service
        .accept_leave(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            parse_id::<EmployeeId>(payload.delegate_id.as_str())?,
        )
        .await?;

    Ok(Json(LifecycleResponse::from(lifecycle)))
}

pub async fn reject_leave_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<RejectLeaveRequest>,
) -> ApiResult<Json<LifecycleResponse>> {
    let lifecycle = state
        .lifecycle_service
        .reject_leave(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            payload.reason.as_str(),
        )
        .await?;

    Ok(Json(LifecycleResponse::from(lifecycle)))
}

pub async fn take_back_leave_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<LeaveReleaseResponse>> {
    let release = state
        .lifecycle_service
        .take_back_leave(&actor, parse_id::<EmployeeId>(employee_id.as_str())?)
        .await?;

    Ok(Json(LeaveReleaseResponse::from(release)))
}

pub async fn suspend_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<RestrictionRequest>,
) -> ApiResult<Json<LifecycleResponse>> {
    let lifecycle = state
        .lifecycle_service
        .suspend(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            RestrictionInput::from(payload),
        )
        .await?;

    Ok(Json(LifecycleResponse::from(lifecycle)))
}

pub async fn block_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<RestrictionRequest>,
) -> ApiResult<Json<LifecycleResponse>> {
    let lifecycle = state
        .lifecycle_service
        .block(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            RestrictionInput::from(payload),
        )
        .await?;

    Ok(Json(LifecycleResponse::from(lifecycle)))
}

pub async fn terminate_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<RestrictionRequest>,
) -> ApiResult<Json<LifecycleResponse>> {
    let lifecycle = state
        .lifecycle_service
        .terminate(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            RestrictionInput::from(payload),
        )
        .await?;

    Ok(Json(LifecycleResponse::from(lifecycle)))
}

pub async fn restore_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<StatusReleaseResponse>> {
    let release = state
        .lifecycle_service
        .restore(&actor, parse_id::<EmployeeId>(employee_id.as_str())?)
        .await?;

    Ok(Json(StatusReleaseResponse::from(release)))
}
