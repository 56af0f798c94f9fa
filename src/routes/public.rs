use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no credentials. Scholarship reads still resolve the
/// caller when a token is present, so a logged-in student sees their
/// institute's scholarships here as well.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Signs up with the auth provider and creates a student profile.
        .route("/register", post(handlers::users::register_user))
        // GET /scholarships?type=...&search=...
        .route("/scholarships", get(handlers::scholarships::list_scholarships))
        // GET /scholarships/{id}
        // Invisible scholarships are a 404.
        .route("/scholarships/{id}", get(handlers::scholarships::get_scholarship))
}
