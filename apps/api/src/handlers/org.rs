use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use orgauth_application::CreateOrgNodeInput;
use orgauth_core::{ActorIdentity, OrgNodeId};
use orgauth_domain::{DepartmentCode, OrgNode};

use crate::dto::{CreateOrgNodeRequest, OrgNodeResponse, ReparentOrgNodeRequest};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_id;

fn into_responses(nodes: Vec<OrgNode>) -> Vec<OrgNodeResponse> {
    nodes.into_iter().map(OrgNodeResponse::from).collect()
}

pub async fn path_to_root_handler(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<Vec<OrgNodeResponse>>> {
    let nodes = state
        .org_tree_service
        .path_to_root(parse_id::<OrgNodeId>(node_id.as_str())?)
        .await?;

    Ok(Json(into_responses(nodes)))
}

pub async fn descendants_handler(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<Vec<OrgNodeResponse>>> {
    let nodes = state
        .org_tree_service
        .descendants(parse_id::<OrgNodeId>(node_id.as_str())?)
        .await?;

    Ok(Json(into_responses(nodes)))
}

pub async fn create_org_node_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CreateOrgNodeRequest>,
) -> ApiResult<(StatusCode, Json<OrgNodeResponse>)> {
    let node = state
        .security_admin_service
        .create_org_node(
            &actor,
            CreateOrgNodeInput {
                parent_id: parse_id::<OrgNodeId>(payload.parent_id.as_str())?,
                name: payload.name,
                department: DepartmentCode::from_str(payload.department.as_str())?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(OrgNodeResponse::from(node))))
}

pub async fn reparent_org_node_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(node_id): Path<String>,
    Json(payload): Json<ReparentOrgNodeRequest>,
) -> ApiResult<Json<Vec<OrgNodeResponse>>> {
    let moved = state
        .security_admin_service
        .reparent_org_node(
            &actor,
            parse_id::<OrgNodeId>(node_id.as_str())?,
            parse_id::<OrgNodeId>(payload.new_parent_id.as_str())?,
        )
        .await?;

    Ok(Json(into_responses(moved)))
}

pub async fn deactivate_org_node_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<OrgNodeResponse>> {
    let node = state
        .security_admin_service
        .deactivate_org_node(&actor, parse_id::<OrgNodeId>(node_id.as_str())?)
        .await?;

    Ok(Json(OrgNodeResponse::from(node)))
}
