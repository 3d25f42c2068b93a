//! Handlers for the `/calls` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use parley_core::call::{CallRecord, CallStatus, CallType};
use parley_core::types::{CallId, UserId};
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::chat::ensure_user;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitiateCallRequest {
    pub receiver_id: UserId,
    pub call_type: CallType,
}

#[derive(Debug, Deserialize)]
pub struct EndCallRequest {
    pub status: CallStatus,
}

/// POST /api/v1/calls
pub async fn initiate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<InitiateCallRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CallRecord>>)> {
    let routed = state
        .router
        .initiate_call(&auth.identity, &input.receiver_id, input.call_type)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: routed.event })))
}

/// POST /api/v1/calls/{id}/end
pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<CallId>,
    Json(input): Json<EndCallRequest>,
) -> AppResult<Json<DataResponse<CallRecord>>> {
    let routed = state
        .router
        .end_call(&auth.identity, &call_id, input.status)
        .await?;
    Ok(Json(DataResponse { data: routed.event }))
}

/// GET /api/v1/calls/history
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<CallRecord>>>> {
    let calls = state.calls.calls_for_user(auth.user_id()).await?;
    Ok(Json(DataResponse { data: calls }))
}

/// GET /api/v1/calls/history/{other_id}
pub async fn history_with(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_id): Path<UserId>,
) -> AppResult<Json<DataResponse<Vec<CallRecord>>>> {
    ensure_user(&state, &other_id).await?;
    let calls = state
        .calls
        .calls_between(auth.user_id(), &other_id)
        .await?;
    Ok(Json(DataResponse { data: calls }))
}
