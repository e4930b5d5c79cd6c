use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/authorize",
            post(handlers::authorization::authorize_handler),
        )
        .route(
            "/api/employees/{employee_id}/effective-permissions",
            get(handlers::authorization::effective_permissions_handler),
        )
        .route(
            "/api/assignments",
            get(handlers::assignments::list_assignments_handler),
        )
        .route(
            "/api/assignments/{employee_id}",
            put(handlers::assignments::place_employee_handler)
                .delete(handlers::assignments::remove_employee_handler),
        )
        .route(
            "/api/assignments/{employee_id}/overrides",
            put(handlers::assignments::set_overrides_handler),
        )
        .route(
            "/api/org/nodes",
            post(handlers::org::create_org_node_handler),
        )
        .route(
            "/api/org/nodes/{node_id}",
            delete(handlers::org::deactivate_org_node_handler),
        )
        .route(
            "/api/org/nodes/{node_id}/path",
            get(handlers::org::path_to_root_handler),
        )
        .route(
            "/api/org/nodes/{node_id}/descendants",
            get(handlers::org::descendants_handler),
        )
        .route(
            "/api/org/nodes/{node_id}/reparent",
            post(handlers::org::reparent_org_node_handler),
        )
        .route(
            "/api/security/permissions",
            get(handlers::security::list_permissions_handler)
                .post(handlers::security::create_permission_handler),
        )
        .route(
            "/api/security/permissions/{permission_id}",
            put(handlers::security::update_permission_handler)
                .delete(handlers::security::delete_permission_handler),
        )
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler)
                .post(handlers::security::create_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}/permissions/{permission_id}",
            post(handlers::security::grant_role_permission_handler)
                .delete(handlers::security::revoke_role_permission_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}",
            get(handlers::lifecycle::lifecycle_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/leave",
            post(handlers::lifecycle::apply_leave_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/leave/accept",
            post(handlers::lifecycle::accept_leave_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/leave/reject",
            post(handlers::lifecycle::reject_leave_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/leave/take-back",
            post(handlers::lifecycle::take_back_leave_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/suspend",
            post(handlers::lifecycle::suspend_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/block",
            post(handlers::lifecycle::block_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/terminate",
            post(handlers::lifecycle::terminate_handler),
        )
        .route(
            "/api/lifecycle/{employee_id}/restore",
            post(handlers::lifecycle::restore_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::enforce_department_isolation,
        ))
        .route_layer(from_fn(middleware::require_actor));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests;
