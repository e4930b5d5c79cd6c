use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use orgauth_application::{AssignmentListQuery, PlaceEmployeeInput, narrow_query};
use orgauth_core::{ActorIdentity, EmployeeId, OrgNodeId, RoleId};
use orgauth_domain::{DepartmentCode, DepartmentScope};

use crate::dto::{
    AssignmentListParams, AssignmentResponse, PlaceEmployeeRequest, SetOverridesRequest,
    parse_overrides,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_id;

pub async fn list_assignments_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Extension(scope): Extension<DepartmentScope>,
    Query(params): Query<AssignmentListParams>,
) -> ApiResult<Json<Vec<AssignmentResponse>>> {
    let query = narrow_query(scope, AssignmentListQuery::try_from(params)?);
    let assignments = state
        .security_admin_service
        .list_assignments(&actor, query)
        .await?
        .into_iter()
        .map(AssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn place_employee_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<PlaceEmployeeRequest>,
) -> ApiResult<Json<AssignmentResponse>> {
    let input = PlaceEmployeeInput {
        employee_id: parse_id::<EmployeeId>(employee_id.as_str())?,
        role_id: parse_id::<RoleId>(payload.role_id.as_str())?,
        org_node_id: parse_id::<OrgNodeId>(payload.org_node_id.as_str())?,
        department: DepartmentCode::from_str(payload.department.as_str())?,
        overrides: parse_overrides(payload.overrides)?,
    };

    let assignment = state
        .security_admin_service
        .place_employee(&actor, input)
        .await?;

    Ok(Json(AssignmentResponse::from(assignment)))
}

pub async fn remove_employee_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .security_admin_service
        .remove_employee(&actor, parse_id::<EmployeeId>(employee_id.as_str())?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_overrides_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(employee_id): Path<String>,
    Json(payload): Json<SetOverridesRequest>,
) -> ApiResult<Json<AssignmentResponse>> {
    let assignment = state
        .security_admin_service
        .set_assignment_overrides(
            &actor,
            parse_id::<EmployeeId>(employee_id.as_str())?,
            parse_overrides(payload.overrides)?,
        )
        .await?;

    Ok(Json(AssignmentResponse::from(assignment)))
}
