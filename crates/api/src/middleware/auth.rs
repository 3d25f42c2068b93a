//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use parley_core::error::CoreError;
use parley_core::identity::Identity;

use crate::error::AppError;
use crate::session::AuthError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// The token goes through the same verification as the WebSocket handshake,
/// including the directory check.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %auth.identity.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    /// Role name from the directory (see [`parley_core::roles`]).
    pub role: String,
}

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Auth(AuthError::MissingCredential))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let user = state.authenticator.verify_account(token.trim()).await?;
        Ok(AuthUser {
            identity: user.identity(),
            role: user.role,
        })
    }
}
