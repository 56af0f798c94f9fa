use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use super::scope_of;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    guard,
    models::{Application, CreateApplicationRequest, Role, UpdateApplicationStatusRequest},
    visibility::{ApplicationFilter, ScholarshipFilter},
};

/// apply_to_scholarship
///
/// [Authenticated Route] Students apply to scholarships they can see. One
/// application per student and scholarship.
#[utoipa::path(
    post,
    path = "/scholarships/{id}/applications",
    params(("id" = i64, Path, description = "Scholarship ID")),
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Submitted", body = Application),
        (status = 400, description = "Deadline passed", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody),
        (status = 409, description = "Already applied", body = crate::error::ErrorBody)
    )
)]
pub async fn apply_to_scholarship(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateApplicationRequest>,
) -> AppResult<(StatusCode, Json<Application>)> {
    if actor.role != Role::Student {
        return Err(AppError::Forbidden);
    }
    let scope = scope_of(&state, &actor).await;

    let scholarship = state
        .repo
        .get_scholarship(id, ScholarshipFilter::visible_to(scope))
        .await?
        .ok_or(AppError::NotFound)?;
    if scholarship
        .deadline
        .is_some_and(|deadline| deadline < Utc::now().date_naive())
    {
        return Err(AppError::BadRequest("application deadline has passed".to_string()));
    }

    let application = state
        .repo
        .create_application(id, actor.id, payload.statement)
        .await?
        .ok_or_else(|| AppError::Conflict("already applied to this scholarship".to_string()))?;
    tracing::info!(
        application_id = application.id,
        scholarship_id = id,
        user_id = %actor.id,
        "application submitted"
    );
    Ok((StatusCode::CREATED, Json(application)))
}

/// list_applications
///
/// [Authenticated Route] Students get their own applications; admins get the
/// applications to scholarships they manage.
#[utoipa::path(
    get,
    path = "/applications",
    responses((status = 200, description = "Applications in scope", body = [Application]))
)]
pub async fn list_applications(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Application>>> {
    let scope = scope_of(&state, &actor).await;
    let filter = ApplicationFilter::for_actor(&actor, scope);
    Ok(Json(state.repo.list_applications(filter).await?))
}

/// update_application_status
///
/// [Authenticated Route] Only the admins who manage the scholarship may
/// decide on its applications. Anything else reads as a 404.
#[utoipa::path(
    patch,
    path = "/applications/{id}/status",
    params(("id" = i64, Path, description = "Application ID")),
    request_body = UpdateApplicationStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Application),
        (status = 403, description = "Forbidden", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_application_status(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateApplicationStatusRequest>,
) -> AppResult<Json<Application>> {
    guard::require_mutating_role(actor.role)?;
    let scope = scope_of(&state, &actor).await;

    let application = state
        .repo
        .set_application_status(id, payload.status, ApplicationFilter::for_actor(&actor, scope))
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(
        application_id = id,
        status = ?payload.status,
        user_id = %actor.id,
        "application status changed"
    );
    Ok(Json(application))
}
