//! Authentication HTTP Handlers
//!
//! JSON endpoints translating requests into [`AuthService`] calls.

use crate::error::AuthError;
use crate::extractors::AuthUser;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use validator::Validate;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_current_user))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(auth_service)
}

// ============================================
// Registration
// ============================================

/// POST /auth/register
pub async fn register(
    State(auth): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = auth.register(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// ============================================
// Login / Logout
// ============================================

/// POST /auth/login
pub async fn login(
    State(auth): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = auth.login(req).await?;

    Ok(Json(response))
}

/// POST /auth/logout
///
/// Revokes every refresh token of the user
pub async fn logout(
    State(auth): State<AuthState>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = auth.logout(req.parse_user_id()?).await?;

    Ok(Json(response))
}

// ============================================
// Token Refresh
// ============================================

/// POST /auth/refresh
pub async fn refresh_token(
    State(auth): State<AuthState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = auth.refresh(&req.refresh_token).await?;

    Ok(Json(response))
}

// ============================================
// User Profile
// ============================================

/// GET /auth/me
pub async fn get_current_user(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let user = auth
        .get_user(user.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(serde_json::json!({
        "user": UserResponse::from(&user)
    })))
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "message": format!("Not Found for route {}", uri),
            "status": 404,
            "success": false
        })),
    )
}
