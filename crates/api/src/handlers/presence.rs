//! Handlers for the `/presence` resource.

use axum::extract::{Path, State};
use axum::Json;
use parley_core::types::UserId;
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::chat::ensure_user;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PresenceStatus {
    pub user_id: UserId,
    pub online: bool,
}

/// GET /api/v1/presence/{user_id}
///
/// Answered from the in-process presence store, not the durable flag.
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<DataResponse<PresenceStatus>>> {
    ensure_user(&state, &user_id).await?;
    let online = state.presence.is_online(&user_id);
    Ok(Json(DataResponse {
        data: PresenceStatus { user_id, online },
    }))
}

/// GET /api/v1/presence
pub async fn list_online(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserId>>>> {
    Ok(Json(DataResponse {
        data: state.presence.online_users(),
    }))
}
