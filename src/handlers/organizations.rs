use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::scope_of;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    guard,
    models::{
        CreateInstituteRequest, CreateUniversityRequest, Institute, OptionItem, University,
        UpdateInstituteRequest, UpdateUniversityRequest,
    },
    visibility::{InstituteFilter, UniversityFilter},
};

// --- Universities ---

/// list_universities
///
/// [Authenticated Route] Universities within the caller's scope.
#[utoipa::path(
    get,
    path = "/universities",
    responses((status = 200, description = "Universities in scope", body = [University]))
)]
pub async fn list_universities(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<University>>> {
    let scope = scope_of(&state, &actor).await;
    let filter = UniversityFilter::for_scope(scope, &*state.repo).await;
    Ok(Json(state.repo.list_universities(filter).await?))
}

/// university_options
///
/// [Authenticated Route] Dropdown entries. An admin whose scope cannot be
/// resolved gets an empty list.
#[utoipa::path(
    get,
    path = "/universities/options",
    responses((status = 200, description = "Options in scope", body = [OptionItem]))
)]
pub async fn university_options(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OptionItem>>> {
    let scope = scope_of(&state, &actor).await;
    let filter = UniversityFilter::for_scope(scope, &*state.repo).await;
    Ok(Json(state.repo.university_options(filter).await?))
}

#[utoipa::path(
    get,
    path = "/universities/{id}",
    params(("id" = i64, Path, description = "University ID")),
    responses(
        (status = 200, description = "Found", body = University),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_university(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<University>> {
    let scope = scope_of(&state, &actor).await;
    let filter = UniversityFilter::for_scope(scope, &*state.repo).await;
    state
        .repo
        .get_university(id, filter)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// create_university
///
/// [Admin Route] Platform admins only.
#[utoipa::path(
    post,
    path = "/admin/universities",
    request_body = CreateUniversityRequest,
    responses((status = 201, description = "Created", body = University))
)]
pub async fn create_university(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUniversityRequest>,
) -> AppResult<(StatusCode, Json<University>)> {
    guard::require_platform_admin(actor.role)?;
    let university = state.repo.create_university(payload).await?;
    tracing::info!(university_id = university.id, user_id = %actor.id, "university created");
    Ok((StatusCode::CREATED, Json(university)))
}

#[utoipa::path(
    put,
    path = "/admin/universities/{id}",
    params(("id" = i64, Path, description = "University ID")),
    request_body = UpdateUniversityRequest,
    responses((status = 200, description = "Updated", body = University))
)]
pub async fn update_university(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUniversityRequest>,
) -> AppResult<Json<University>> {
    guard::require_platform_admin(actor.role)?;
    state
        .repo
        .update_university(id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/admin/universities/{id}",
    params(("id" = i64, Path, description = "University ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_university(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    guard::require_platform_admin(actor.role)?;
    if state.repo.delete_university(id).await? {
        tracing::info!(university_id = id, user_id = %actor.id, "university deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- Institutes ---

/// list_institutes
///
/// [Authenticated Route] Institutes within the caller's scope.
#[utoipa::path(
    get,
    path = "/institutes",
    responses((status = 200, description = "Institutes in scope", body = [Institute]))
)]
pub async fn list_institutes(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Institute>>> {
    let scope = scope_of(&state, &actor).await;
    let filter = InstituteFilter::for_scope(scope);
    Ok(Json(state.repo.list_institutes(filter).await?))
}

/// institute_options
///
/// [Authenticated Route] Dropdown entries, scoped like `list_institutes`.
#[utoipa::path(
    get,
    path = "/institutes/options",
    responses((status = 200, description = "Options in scope", body = [OptionItem]))
)]
pub async fn institute_options(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OptionItem>>> {
    let scope = scope_of(&state, &actor).await;
    let filter = InstituteFilter::for_scope(scope);
    Ok(Json(state.repo.institute_options(filter).await?))
}

#[utoipa::path(
    get,
    path = "/institutes/{id}",
    params(("id" = i64, Path, description = "Institute ID")),
    responses(
        (status = 200, description = "Found", body = Institute),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_institute(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Institute>> {
    let scope = scope_of(&state, &actor).await;
    state
        .repo
        .get_institute(id, InstituteFilter::for_scope(scope))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// create_institute
///
/// [Authenticated Route] Platform admins anywhere; university admins inside
/// their own university.
#[utoipa::path(
    post,
    path = "/institutes",
    request_body = CreateInstituteRequest,
    responses(
        (status = 201, description = "Created", body = Institute),
        (status = 403, description = "Outside caller's scope", body = crate::error::ErrorBody)
    )
)]
pub async fn create_institute(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateInstituteRequest>,
) -> AppResult<(StatusCode, Json<Institute>)> {
    let scope = scope_of(&state, &actor).await;
    guard::authorize_institute_write(actor.role, scope, None, payload.university_id)?;

    if state
        .repo
        .get_university(payload.university_id, UniversityFilter::All)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("unknown university_id".to_string()));
    }

    let institute = state.repo.create_institute(payload).await?;
    tracing::info!(institute_id = institute.id, user_id = %actor.id, "institute created");
    Ok((StatusCode::CREATED, Json(institute)))
}

/// update_institute
///
/// [Authenticated Route] A university admin can neither edit another
/// university's institute nor move its own institute elsewhere.
#[utoipa::path(
    put,
    path = "/institutes/{id}",
    params(("id" = i64, Path, description = "Institute ID")),
    request_body = UpdateInstituteRequest,
    responses(
        (status = 200, description = "Updated", body = Institute),
        (status = 403, description = "Outside caller's scope", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_institute(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInstituteRequest>,
) -> AppResult<Json<Institute>> {
    guard::require_mutating_role(actor.role)?;
    let scope = scope_of(&state, &actor).await;
    let filter = InstituteFilter::for_scope(scope);

    let stored = state
        .repo
        .get_institute(id, filter)
        .await?
        .ok_or(AppError::NotFound)?;
    let proposed_university = payload.university_id.unwrap_or(stored.university_id);
    guard::authorize_institute_write(actor.role, scope, Some(&stored), proposed_university)?;

    if proposed_university != stored.university_id
        && state
            .repo
            .get_university(proposed_university, UniversityFilter::All)
            .await?
            .is_none()
    {
        return Err(AppError::BadRequest("unknown university_id".to_string()));
    }

    state
        .repo
        .update_institute(id, payload, filter)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/admin/institutes/{id}",
    params(("id" = i64, Path, description = "Institute ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_institute(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    guard::require_platform_admin(actor.role)?;
    if state.repo.delete_institute(id).await? {
        tracing::info!(institute_id = id, user_id = %actor.id, "institute deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
