use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Nested under `/admin`. Every handler extracts `AuthUser`, so unauthenticated
/// requests are rejected before any role check. Organization management is
/// reserved to platform admins; the dashboard is open to every admin role and
/// counts only what the caller can see.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        .route("/stats", get(handlers::users::get_dashboard_stats))
        // POST /admin/universities
        .route(
            "/universities",
            post(handlers::organizations::create_university),
        )
        // PUT/DELETE /admin/universities/{id}
        .route(
            "/universities/{id}",
            put(handlers::organizations::update_university)
                .delete(handlers::organizations::delete_university),
        )
        // DELETE /admin/institutes/{id}
        .route(
            "/institutes/{id}",
            delete(handlers::organizations::delete_institute),
        )
        // PUT /admin/users/{id}/role
        // Only a super_admin may grant or revoke platform roles.
        .route("/users/{id}/role", put(handlers::users::assign_role))
}
