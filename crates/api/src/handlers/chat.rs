//! Handlers for the `/chat` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use parley_core::chat::{ChatMessage, ReadReceipt};
use parley_core::error::CoreError;
use parley_core::types::{MessageId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: UserId,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: Vec<MessageId>,
    pub notified: bool,
}

/// POST /api/v1/chat/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ChatMessage>>)> {
    let routed = state
        .router
        .route(&auth.identity, &input.receiver_id, input.content)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: routed.event })))
}

/// GET /api/v1/chat/conversations/{other_id}
///
/// Both directions between the caller and `other_id`, oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_id): Path<UserId>,
) -> AppResult<Json<DataResponse<Vec<ChatMessage>>>> {
    ensure_user(&state, &other_id).await?;
    let messages = state
        .messages
        .find_conversation(auth.user_id(), &other_id)
        .await?;
    Ok(Json(DataResponse { data: messages }))
}

/// GET /api/v1/chat/unread/{sender_id}
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(sender_id): Path<UserId>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let unread = state
        .messages
        .find_unread(&sender_id, auth.user_id())
        .await?;
    Ok(Json(DataResponse {
        data: UnreadCount {
            count: unread.len(),
        },
    }))
}

/// POST /api/v1/chat/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(receipt): Json<ReadReceipt>,
) -> AppResult<Json<DataResponse<MarkReadResponse>>> {
    let result = state.receipts.mark_read(&receipt, &auth.identity).await?;
    Ok(Json(DataResponse {
        data: MarkReadResponse {
            updated: result.updated,
            notified: result.notified,
        },
    }))
}

pub(crate) async fn ensure_user(state: &AppState, user_id: &str) -> AppResult<()> {
    if state.users.user_exists(user_id).await? {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id.to_string(),
        }))
    }
}
