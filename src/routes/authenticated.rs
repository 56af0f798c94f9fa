use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`. Role and scope checks
/// happen inside the handlers, after the caller's scope is resolved.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::users::get_me))
        // --- Scholarships ---
        // POST /scholarships
        // Admin roles only, inside their own organization.
        .route("/scholarships", post(handlers::scholarships::create_scholarship))
        // PUT/DELETE /scholarships/{id}
        // Checked against the stored record before the write.
        .route(
            "/scholarships/{id}",
            put(handlers::scholarships::update_scholarship)
                .delete(handlers::scholarships::delete_scholarship),
        )
        // --- Applications ---
        .route(
            "/scholarships/{id}/applications",
            post(handlers::applications::apply_to_scholarship),
        )
        .route("/applications", get(handlers::applications::list_applications))
        .route(
            "/applications/{id}/status",
            patch(handlers::applications::update_application_status),
        )
        // --- Organizations ---
        // The options endpoints feed form dropdowns and are scoped like the lists.
        .route("/universities", get(handlers::organizations::list_universities))
        .route(
            "/universities/options",
            get(handlers::organizations::university_options),
        )
        .route("/universities/{id}", get(handlers::organizations::get_university))
        .route(
            "/institutes",
            get(handlers::organizations::list_institutes)
                .post(handlers::organizations::create_institute),
        )
        .route(
            "/institutes/options",
            get(handlers::organizations::institute_options),
        )
        .route(
            "/institutes/{id}",
            get(handlers::organizations::get_institute)
                .put(handlers::organizations::update_institute),
        )
        // --- Users ---
        // Students only ever see themselves.
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}", get(handlers::users::get_user))
}
