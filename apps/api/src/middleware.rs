use std::str::FromStr;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use orgauth_core::{ActorIdentity, AppError, EmployeeId};
use orgauth_domain::DepartmentCode;

use crate::error::ApiResult;
use crate::state::AppState;

pub const EMPLOYEE_ID_HEADER: &str = "x-employee-id";
pub const EMPLOYEE_NAME_HEADER: &str = "x-employee-name";
pub const EMPLOYEE_EMAIL_HEADER: &str = "x-employee-email";
pub const TARGET_DEPARTMENT_HEADER: &str = "x-target-department";

/// Resolves the caller forwarded by the authenticating gateway.
pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let actor = actor_from_headers(request.headers())?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Applies department isolation and attaches the resulting scope.
pub async fn enforce_department_isolation(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let actor_id = request
        .extensions()
        .get::<ActorIdentity>()
        .map(ActorIdentity::employee_id)
        .ok_or_else(|| AppError::Unauthorized("actor identity required".to_owned()))?;
    let target_department = header_value(request.headers(), TARGET_DEPARTMENT_HEADER)
        .map(DepartmentCode::from_str)
        .transpose()?;

    let scope = state
        .department_guard
        .evaluate(actor_id, target_department)
        .await?
        .into_scope()?;

    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}

fn actor_from_headers(headers: &HeaderMap) -> Result<ActorIdentity, AppError> {
    let employee_id = header_value(headers, EMPLOYEE_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("{EMPLOYEE_ID_HEADER} header is required")))?;
    let employee_id = EmployeeId::from_str(employee_id)
        .map_err(|error| AppError::Unauthorized(error.to_string()))?;
    let display_name = header_value(headers, EMPLOYEE_NAME_HEADER)
        .map(str::to_owned)
        .unwrap_or_else(|| employee_id.to_string());
    let email = header_value(headers, EMPLOYEE_EMAIL_HEADER).map(str::to_owned);

    Ok(ActorIdentity::new(employee_id, display_name, email))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
