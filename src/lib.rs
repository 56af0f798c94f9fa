use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Authorization core: who the caller is scoped to, what they may see and change.
pub mod guard;
pub mod scope;
pub mod visibility;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use scope::{Actor, Scope, UniversityLookup};

/// ApiDoc
///
/// OpenAPI document for every routed handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::get_me,
        handlers::users::list_users, handlers::users::get_user,
        handlers::users::assign_role, handlers::users::get_dashboard_stats,
        handlers::scholarships::list_scholarships, handlers::scholarships::get_scholarship,
        handlers::scholarships::create_scholarship, handlers::scholarships::update_scholarship,
        handlers::scholarships::delete_scholarship,
        handlers::applications::apply_to_scholarship, handlers::applications::list_applications,
        handlers::applications::update_application_status,
        handlers::organizations::list_universities, handlers::organizations::university_options,
        handlers::organizations::get_university, handlers::organizations::create_university,
        handlers::organizations::update_university, handlers::organizations::delete_university,
        handlers::organizations::list_institutes, handlers::organizations::institute_options,
        handlers::organizations::get_institute, handlers::organizations::create_institute,
        handlers::organizations::update_institute, handlers::organizations::delete_institute,
    ),
    components(
        schemas(
            models::Role, models::User, models::UserProfile, models::RegisterUserRequest,
            models::AssignRoleRequest, models::University, models::Institute,
            models::CreateUniversityRequest, models::UpdateUniversityRequest,
            models::CreateInstituteRequest, models::UpdateInstituteRequest, models::OptionItem,
            models::ScholarshipType, models::Scholarship, models::CreateScholarshipRequest,
            models::UpdateScholarshipRequest, models::ApplicationStatus, models::Application,
            models::CreateApplicationRequest, models::UpdateApplicationStatusRequest,
            models::DashboardStats, error::ErrorBody,
        )
    ),
    tags(
        (name = "scholarship-portal", description = "Scholarship Management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for the services every handler needs.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer. Also answers the institute-to-university lookups
    /// used during scope resolution.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted. Scope and
/// role checks stay in the handlers.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, the auth layer for authenticated routes, and
/// the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers extract `AuthUser` themselves and check the role.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with its `x-request-id` so every log
/// line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
