use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{verify_password, CurrentUser, Permission};
use crate::error::{ApiError, ApiResult};
use crate::models::UserResponse;
use crate::routes::extract::ValidatedJson;
use crate::AppState;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password required"))]
    pub password: String,
}

/// Login response: the user record (without password) plus a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = state
        .storage
        .get_user_by_username(&request.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %request.username, "Login attempt for unknown user");
            invalid()
        })?;

    if !verify_password(&request.password, &user.password_hash) {
        warn!(username = %request.username, "Login attempt with wrong password");
        return Err(invalid());
    }

    let token = state.jwt.issue(&user)?;
    info!(username = %user.username, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        user: user.into(),
        token,
    }))
}

/// `GET /api/auth/check` - unauthenticated liveness probe.
pub async fn check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "message": "Server is running" }))
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<UserResponse>> {
    let user = state.storage.get_user(&current.id).await?;
    Ok(Json(user.into()))
}

/// `GET /api/users`
pub async fn list_users(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Vec<UserResponse>>> {
    current.require(Permission::ListUsers)?;
    let users = state.storage.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
