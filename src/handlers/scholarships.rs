use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::scope_of;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    guard,
    models::{
        CreateScholarshipRequest, Scholarship, ScholarshipDraft, ScholarshipQuery,
        UpdateScholarshipRequest,
    },
    scope::resolve_optional_scope,
    visibility::{InstituteFilter, ScholarshipFilter, UniversityFilter},
};

/// Owner ids from the payload must name existing organizations.
async fn require_known_owner(state: &AppState, draft: &ScholarshipDraft) -> AppResult<()> {
    if let Some(university_id) = draft.university_id {
        if state
            .repo
            .get_university(university_id, UniversityFilter::All)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("unknown university_id".to_string()));
        }
    }
    if let Some(institute_id) = draft.institute_id {
        if state
            .repo
            .get_institute(institute_id, InstituteFilter::All)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("unknown institute_id".to_string()));
        }
    }
    Ok(())
}

/// list_scholarships
///
/// [Public Route] Lists the scholarships visible to the caller. Anonymous
/// callers see government and private scholarships only.
#[utoipa::path(
    get,
    path = "/scholarships",
    params(ScholarshipQuery),
    responses((status = 200, description = "Visible scholarships", body = [Scholarship]))
)]
pub async fn list_scholarships(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<ScholarshipQuery>,
) -> AppResult<Json<Vec<Scholarship>>> {
    let actor = caller.map(|AuthUser(actor)| actor);
    let scope = resolve_optional_scope(actor.as_ref(), &*state.repo).await;
    let filter = ScholarshipFilter::visible_to(scope);
    Ok(Json(state.repo.list_scholarships(filter, query).await?))
}

/// get_scholarship
///
/// [Public Route] A scholarship outside the caller's visibility is a 404,
/// indistinguishable from one that does not exist.
#[utoipa::path(
    get,
    path = "/scholarships/{id}",
    params(("id" = i64, Path, description = "Scholarship ID")),
    responses(
        (status = 200, description = "Found", body = Scholarship),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_scholarship(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Scholarship>> {
    let actor = caller.map(|AuthUser(actor)| actor);
    let scope = resolve_optional_scope(actor.as_ref(), &*state.repo).await;
    state
        .repo
        .get_scholarship(id, ScholarshipFilter::visible_to(scope))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// create_scholarship
///
/// [Authenticated Route] University and institute admins may only create
/// scholarships of their own type and organization.
#[utoipa::path(
    post,
    path = "/scholarships",
    request_body = CreateScholarshipRequest,
    responses(
        (status = 201, description = "Created", body = Scholarship),
        (status = 400, description = "Unknown or missing owner", body = crate::error::ErrorBody),
        (status = 403, description = "Outside caller's scope", body = crate::error::ErrorBody)
    )
)]
pub async fn create_scholarship(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateScholarshipRequest>,
) -> AppResult<(StatusCode, Json<Scholarship>)> {
    guard::require_mutating_role(actor.role)?;
    let draft = ScholarshipDraft::from(payload);
    draft.validate_owner()?;

    let scope = scope_of(&state, &actor).await;
    guard::authorize_scholarship_create(actor.role, scope, &draft)?;
    require_known_owner(&state, &draft).await?;

    let scholarship = state.repo.create_scholarship(draft, actor.id).await?;
    tracing::info!(scholarship_id = scholarship.id, user_id = %actor.id, "scholarship created");
    Ok((StatusCode::CREATED, Json(scholarship)))
}

/// update_scholarship
///
/// [Authenticated Route] Authorization is decided on the stored record first,
/// then on the merged result, and the write itself is conditioned on the
/// caller's manage filter.
#[utoipa::path(
    put,
    path = "/scholarships/{id}",
    params(("id" = i64, Path, description = "Scholarship ID")),
    request_body = UpdateScholarshipRequest,
    responses(
        (status = 200, description = "Updated", body = Scholarship),
        (status = 403, description = "Outside caller's scope", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_scholarship(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateScholarshipRequest>,
) -> AppResult<Json<Scholarship>> {
    guard::require_mutating_role(actor.role)?;
    let scope = scope_of(&state, &actor).await;

    let stored = state
        .repo
        .get_scholarship(id, ScholarshipFilter::visible_to(scope))
        .await?
        .ok_or(AppError::NotFound)?;

    let proposed = stored.merged(payload);
    proposed.validate_owner()?;
    guard::authorize_scholarship_update(actor.role, scope, &stored, &proposed)?;
    require_known_owner(&state, &proposed).await?;

    let updated = state
        .repo
        .update_scholarship(id, proposed, ScholarshipFilter::manageable_by(actor.role, scope))
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(scholarship_id = id, user_id = %actor.id, "scholarship updated");
    Ok(Json(updated))
}

/// delete_scholarship
///
/// [Authenticated Route] Checked against the stored record.
#[utoipa::path(
    delete,
    path = "/scholarships/{id}",
    params(("id" = i64, Path, description = "Scholarship ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Outside caller's scope", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_scholarship(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    guard::require_mutating_role(actor.role)?;
    let scope = scope_of(&state, &actor).await;

    let stored = state
        .repo
        .get_scholarship(id, ScholarshipFilter::visible_to(scope))
        .await?
        .ok_or(AppError::NotFound)?;
    guard::authorize_scholarship_delete(actor.role, scope, &stored)?;

    if state
        .repo
        .delete_scholarship(id, ScholarshipFilter::manageable_by(actor.role, scope))
        .await?
    {
        tracing::info!(scholarship_id = id, user_id = %actor.id, "scholarship deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
