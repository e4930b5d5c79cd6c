use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use orgauth_application::BootstrapInput;
use orgauth_core::{EmployeeId, OrgNodeId, RoleId};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::api_config::{ApiCommand, ApiConfig};
use crate::api_services::{RepositorySet, build_app_state};
use crate::middleware::{EMPLOYEE_ID_HEADER, TARGET_DEPARTMENT_HEADER};

struct Harness {
    router: Router,
    chairman_id: EmployeeId,
    root_id: OrgNodeId,
    role_id: RoleId,
}

async fn harness() -> Harness {
    let config = ApiConfig::from_lookup(ApiCommand::Serve, |name| {
        (name == "STORE_BACKEND").then(|| "memory".to_owned())
    });
    assert!(config.is_ok());
    let config = config.unwrap_or_else(|_| unreachable!());

    let state = build_app_state(RepositorySet::in_memory(), &config);
    assert!(state.is_ok());
    let state = state.unwrap_or_else(|_| unreachable!());

    let chairman_id = EmployeeId::new();
    let outcome = state
        .security_admin_service
        .bootstrap(BootstrapInput {
            root_name: "CHAIRMAN".to_owned(),
            chairman_id,
            role_name: "Chairman".to_owned(),
        })
        .await;
    assert!(outcome.is_ok());
    let outcome = outcome.unwrap_or_else(|_| unreachable!());

    Harness {
        router: build_router(state),
        chairman_id,
        root_id: outcome.root.id(),
        role_id: outcome.role.id(),
    }
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    actor: Option<EmployeeId>,
    extra_headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(EMPLOYEE_ID_HEADER, actor.to_string());
    }
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    assert!(request.is_ok());
    let request = request.unwrap_or_else(|_| unreachable!());

    let response = router.clone().oneshot(request).await;
    assert!(response.is_ok());
    let response = response.unwrap_or_else(|_| unreachable!());
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await;
    assert!(bytes.is_ok());
    let bytes = bytes.unwrap_or_else(|_| unreachable!());
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, payload)
}

/// Creates a FINANCE node under the root and places a new employee there.
async fn place_finance_employee(harness: &Harness) -> EmployeeId {
    let (status, node) = send(
        &harness.router,
        Method::POST,
        "/api/org/nodes",
        Some(harness.chairman_id),
        &[],
        Some(json!({
            "parent_id": harness.root_id.to_string(),
            "name": "FINANCE",
            "department": "FINANCE",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(node["path"], "CHAIRMAN.FINANCE");

    let employee_id = EmployeeId::new();
    let (status, assignment) = send(
        &harness.router,
        Method::PUT,
        format!("/api/assignments/{employee_id}").as_str(),
        Some(harness.chairman_id),
        &[],
        Some(json!({
            "role_id": harness.role_id.to_string(),
            "org_node_id": node["node_id"],
            "department": "FINANCE",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assignment["department"], "FINANCE");

    employee_id
}

#[tokio::test]
async fn health_needs_no_identity() {
    let harness = harness().await;
    let (status, payload) = send(&harness.router, Method::GET, "/health", None, &[], None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_an_employee_header() {
    let harness = harness().await;
    let (status, payload) = send(
        &harness.router,
        Method::POST,
        "/api/authorize",
        None,
        &[],
        Some(json!({
            "target_id": harness.chairman_id.to_string(),
            "action": "employee.suspend",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(payload["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn authorize_returns_verdicts_for_both_directions() {
    let harness = harness().await;
    let employee_id = place_finance_employee(&harness).await;

    let (status, allowed) = send(
        &harness.router,
        Method::POST,
        "/api/authorize",
        Some(harness.chairman_id),
        &[],
        Some(json!({
            "target_id": employee_id.to_string(),
            "action": "employee.suspend",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(allowed["allowed"], true);
    assert_eq!(allowed["reason_code"], "ADMINISTRATIVE_ALLOWED");
    assert_eq!(allowed["status_category"], 200);

    let (status, denied) = send(
        &harness.router,
        Method::POST,
        "/api/authorize",
        Some(employee_id),
        &[],
        Some(json!({
            "target_id": harness.chairman_id.to_string(),
            "action": "employee.suspend",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(denied["allowed"], false);
    assert_eq!(denied["reason_code"], "HIERARCHY_LEVEL_VIOLATION");
    assert_eq!(denied["step"], "hierarchy_level");
    assert_eq!(denied["status_category"], 403);
}

#[tokio::test]
async fn department_staff_cannot_target_other_departments() {
    let harness = harness().await;
    let employee_id = place_finance_employee(&harness).await;

    let (status, payload) = send(
        &harness.router,
        Method::GET,
        "/api/assignments",
        Some(employee_id),
        &[(TARGET_DEPARTMENT_HEADER, "HR")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(payload["code"], "FORBIDDEN");

    let (status, listing) = send(
        &harness.router,
        Method::GET,
        "/api/assignments",
        Some(employee_id),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listing = listing.as_array().cloned().unwrap_or_default();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["employee_id"], employee_id.to_string());
}

#[tokio::test]
async fn employees_read_their_own_effective_permissions() {
    let harness = harness().await;
    let employee_id = place_finance_employee(&harness).await;

    let (status, payload) = send(
        &harness.router,
        Method::GET,
        format!("/api/employees/{employee_id}/effective-permissions").as_str(),
        Some(employee_id),
        &[],
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["department_code"], "FINANCE");
    assert_eq!(payload["is_executive"], false);
    let actions: Vec<&str> = payload["effective"]
        .as_array()
        .map(|permissions| {
            permissions
                .iter()
                .filter_map(|permission| permission["action"].as_str())
                .collect()
        })
        .unwrap_or_default();
    assert!(actions.contains(&"leave.apply"));
}

#[tokio::test]
async fn suspension_round_trips_through_restore() {
    let harness = harness().await;
    let employee_id = place_finance_employee(&harness).await;

    let (status, suspended) = send(
        &harness.router,
        Method::POST,
        format!("/api/lifecycle/{employee_id}/suspend").as_str(),
        Some(harness.chairman_id),
        &[],
        Some(json!({ "reason": "audit in progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(suspended["state"], "suspended");
    assert_eq!(suspended["has_snapshot"], true);

    let restore_uri = format!("/api/lifecycle/{employee_id}/restore");
    let (status, restored) = send(
        &harness.router,
        Method::POST,
        restore_uri.as_str(),
        Some(harness.chairman_id),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["outcome"], "restored");

    let (status, repeated) = send(
        &harness.router,
        Method::POST,
        restore_uri.as_str(),
        Some(harness.chairman_id),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repeated["outcome"], "already_restored");
}

#[tokio::test]
async fn accepting_a_missing_leave_is_an_invalid_transition() {
    let harness = harness().await;
    let employee_id = place_finance_employee(&harness).await;

    let (status, payload) = send(
        &harness.router,
        Method::POST,
        format!("/api/lifecycle/{employee_id}/leave/accept").as_str(),
        Some(harness.chairman_id),
        &[],
        Some(json!({ "delegate_id": harness.chairman_id.to_string() })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["code"], "INVALID_TRANSITION");
}
