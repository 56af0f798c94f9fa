mod common;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use common::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use scholarship_portal::{
    AppError, AppState,
    auth::{AuthUser, Claims},
    config::{AppConfig, Env},
    models::Role,
};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn create_token(user_id: Uuid, secret: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState {
        repo: Arc::new(InMemoryRepository::seeded()),
        config,
    }
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

fn with_bypass(parts: &mut Parts, user_id: Uuid) {
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
}

async fn extract(parts: &mut Parts, state: &AppState) -> Result<AuthUser, AppError> {
    <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await
}

async fn extract_optional(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<AuthUser>, AppError> {
    <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state).await
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(Env::Production);
    let token = create_token(ENGINEERING_ADMIN, TEST_JWT_SECRET, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let AuthUser(actor) = extract(&mut parts, &app_state).await.unwrap();
    assert_eq!(actor.id, ENGINEERING_ADMIN);
    // Role and affiliation come from the stored row.
    assert_eq!(actor.role, Role::InstituteAdmin);
    assert_eq!(actor.institute_id, Some(NORTHFIELD_ENGINEERING));
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let err = extract(&mut parts, &app_state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let app_state = create_app_state(Env::Production);
    let token = create_token(ENGINEERING_ADMIN, "some-other-secret", 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let err = extract(&mut parts, &app_state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let app_state = create_app_state(Env::Production);
    // Well past the default validation leeway.
    let token = create_token(ENGINEERING_ADMIN, TEST_JWT_SECRET, -3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let err = extract(&mut parts, &app_state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[tokio::test]
async fn test_valid_token_for_unknown_user_is_rejected() {
    let app_state = create_app_state(Env::Production);
    let token = create_token(Uuid::new_v4(), TEST_JWT_SECRET, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let err = extract(&mut parts, &app_state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[tokio::test]
async fn test_local_bypass_success() {
    let app_state = create_app_state(Env::Local);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bypass(&mut parts, PLATFORM_ADMIN);

    let AuthUser(actor) = extract(&mut parts, &app_state).await.unwrap();
    assert_eq!(actor.id, PLATFORM_ADMIN);
    assert_eq!(actor.role, Role::Admin);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let app_state = create_app_state(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header
    with_bypass(&mut parts, PLATFORM_ADMIN);

    let err = extract(&mut parts, &app_state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[tokio::test]
async fn test_optional_auth_without_credentials_is_anonymous() {
    let app_state = create_app_state(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/scholarships".parse().unwrap());

    assert!(extract_optional(&mut parts, &app_state).await.unwrap().is_none());
}

#[tokio::test]
async fn test_optional_auth_with_bad_credentials_is_rejected() {
    let app_state = create_app_state(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/scholarships".parse().unwrap());
    with_bearer(&mut parts, "not-a-jwt");

    // Invalid credentials never degrade to anonymous access.
    let err = extract_optional(&mut parts, &app_state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[tokio::test]
async fn test_optional_auth_with_valid_token() {
    let app_state = create_app_state(Env::Production);
    let token = create_token(ENGINEERING_STUDENT, TEST_JWT_SECRET, 3600);

    let mut parts = get_request_parts(Method::GET, "/scholarships".parse().unwrap());
    with_bearer(&mut parts, &token);

    let AuthUser(actor) = extract_optional(&mut parts, &app_state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(actor.role, Role::Student);
}
