//! Handlers for the `/users` directory.
//!
//! Lets clients turn a handle into the id that chat and call operations
//! address. The `online` field is answered from the in-process presence
//! store, which is authoritative; the durable flag may lag behind it.

use axum::extract::{Path, State};
use axum::Json;
use parley_core::error::CoreError;
use parley_core::store::{UserRecord, UserSummary};
use parley_core::types::UserId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

fn summarize(state: &AppState, user: &UserRecord) -> UserSummary {
    UserSummary {
        online: state.presence.is_online(&user.id),
        ..UserSummary::from(user)
    }
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<UserId>,
) -> AppResult<Json<DataResponse<UserSummary>>> {
    let user = state
        .users
        .find_user(&id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id: id.clone(),
            })
        })?;
    Ok(Json(DataResponse {
        data: summarize(&state, &user),
    }))
}

/// GET /api/v1/users/by-username/{username}
pub async fn get_user_by_username(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<DataResponse<UserSummary>>> {
    let user = state
        .users
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id: username.clone(),
            })
        })?;
    Ok(Json(DataResponse {
        data: summarize(&state, &user),
    }))
}

/// GET /api/v1/users
///
/// Full directory listing. Admin only.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<UserSummary>>>> {
    let users = state.users.list_users().await?;
    Ok(Json(DataResponse {
        data: users.iter().map(|u| summarize(&state, u)).collect(),
    }))
}
