//! Handlers for the `/auth` resource (register, login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parley_core::error::CoreError;
use parley_core::roles::ROLE_USER;
use parley_core::store::{NewUser, UserRecord};
use parley_core::types::UserId;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::issue_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::presence::disconnect_and_announce;
use crate::state::AppState;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful authentication response returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and return a token for it.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = input.username.trim().to_string();
    validate_username(&username)?;
    let email = input.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Core(CoreError::Validation(
            "Email address is not valid".into(),
        )));
    }
    validate_password_strength(&input.password).map_err(CoreError::Validation)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = state
        .users
        .create_user(NewUser {
            username,
            email,
            password_hash,
            role: ROLE_USER.to_string(),
        })
        .await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .users
        .find_user_by_username(input.username.trim())
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    Ok(Json(auth_response(&state, &user)?))
}

/// POST /api/v1/auth/logout
///
/// Close the caller's live sessions and take them offline. Tokens are
/// stateless and stay valid until they expire.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    let closed = state.ws_manager.close_user(auth.user_id()).await;
    let announced = disconnect_and_announce(&state.presence, &state.notifier, auth.user_id());
    tracing::info!(user_id = %auth.user_id(), closed, announced, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        ))));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::Core(CoreError::Validation(
            "Username may only contain letters, digits, '_', '-' and '.'".into(),
        )));
    }
    Ok(())
}

fn auth_response(state: &AppState, user: &UserRecord) -> AppResult<AuthResponse> {
    let token = issue_token(&user.identity(), &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    Ok(AuthResponse {
        token,
        user_id: user.id.clone(),
        username: user.username.clone(),
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
    })
}
