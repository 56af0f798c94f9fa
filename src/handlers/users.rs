use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use uuid::Uuid;

use super::scope_of;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    guard,
    models::{
        AssignRoleRequest, DashboardStats, NewUser, RegisterUserRequest, Role, User, UserProfile,
    },
    visibility::{ApplicationFilter, ScholarshipFilter, UniversityFilter, UserFilter},
};

/// Minimal view of the auth provider's signup response.
#[derive(Deserialize)]
struct SignupResponse {
    id: Uuid,
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .repo
        .get_user(actor.id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(UserProfile::from(user)))
}

/// list_users
///
/// [Authenticated Route] Accounts within the caller's scope. Students only see
/// themselves.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "Users in scope", body = [User]))
)]
pub async fn list_users(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<User>>> {
    let scope = scope_of(&state, &actor).await;
    let filter = UserFilter::for_actor(&actor, scope);
    Ok(Json(state.repo.list_users(filter).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_user(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let scope = scope_of(&state, &actor).await;
    state
        .repo
        .find_user(id, UserFilter::for_actor(&actor, scope))
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// assign_role
///
/// [Admin Route] Sets a user's role and affiliation. The affiliation must be
/// enough for the role's scope to resolve, and a university/institute pair
/// must agree.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Inconsistent affiliation", body = crate::error::ErrorBody),
        (status = 403, description = "Forbidden", body = crate::error::ErrorBody)
    )
)]
pub async fn assign_role(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> AppResult<Json<User>> {
    guard::require_platform_admin(actor.role)?;
    let target = state.repo.get_user(id).await?.ok_or(AppError::NotFound)?;
    guard::authorize_role_assignment(actor.role, Role::parse(&target.role), payload.role)?;

    match payload.role {
        Role::UniversityAdmin
            if payload.university_id.is_none() && payload.institute_id.is_none() =>
        {
            return Err(AppError::BadRequest(
                "university_admin requires university_id or institute_id".to_string(),
            ));
        }
        Role::InstituteAdmin if payload.institute_id.is_none() => {
            return Err(AppError::BadRequest(
                "institute_admin requires institute_id".to_string(),
            ));
        }
        _ => {}
    }

    if let Some(university_id) = payload.university_id {
        if state
            .repo
            .get_university(university_id, UniversityFilter::All)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("unknown university_id".to_string()));
        }
    }

    if let Some(institute_id) = payload.institute_id {
        let owner = state
            .repo
            .university_for_institute(institute_id)
            .await
            .ok_or_else(|| AppError::BadRequest("unknown institute_id".to_string()))?;
        if payload.university_id.is_some_and(|university_id| university_id != owner) {
            return Err(AppError::BadRequest(
                "institute_id does not belong to university_id".to_string(),
            ));
        }
    }

    let user = state
        .repo
        .assign_role(id, &payload)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(
        target_user = %id,
        user_id = %actor.id,
        role = payload.role.as_str(),
        "role assigned"
    );
    Ok(Json(user))
}

/// get_dashboard_stats
///
/// [Admin Route] Counters for the dashboard, each computed under the caller's
/// own filters. Students are refused.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn get_dashboard_stats(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardStats>> {
    guard::require_mutating_role(actor.role)?;
    let scope = scope_of(&state, &actor).await;
    let stats = state
        .repo
        .get_stats(
            ScholarshipFilter::visible_to(scope),
            UserFilter::for_actor(&actor, scope),
            ApplicationFilter::for_actor(&actor, scope),
        )
        .await?;
    Ok(Json(stats))
}

/// register_user
///
/// [Public Route] Signs the user up with the external auth provider, then
/// mirrors the account into `users` under the provider's id. Self-registered
/// accounts are always students.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = UserProfile),
        (status = 400, description = "Rejected", body = crate::error::ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<Json<UserProfile>> {
    let (provider_url, provider_key) = state
        .config
        .auth_provider()
        .ok_or_else(|| AppError::Internal("auth provider is not configured".to_string()))?;

    if let Some(institute_id) = payload.institute_id {
        if state.repo.university_for_institute(institute_id).await.is_none() {
            return Err(AppError::BadRequest("unknown institute_id".to_string()));
        }
    }

    let response = reqwest::Client::new()
        .post(format!("{provider_url}/auth/v1/signup"))
        .header("apikey", provider_key)
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("signup request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::BadRequest("signup rejected".to_string()));
    }

    let signup = response
        .json::<SignupResponse>()
        .await
        .map_err(|e| AppError::Internal(format!("unexpected signup response: {e}")))?;

    let user = state
        .repo
        .create_user(NewUser {
            id: signup.id,
            email: payload.email,
            full_name: payload.full_name,
            role: Role::Student,
            institute_id: payload.institute_id,
        })
        .await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(Json(UserProfile::from(user)))
}
