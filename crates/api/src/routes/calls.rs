//! Route definitions for the `/calls` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::calls;
use crate::state::AppState;

/// Routes mounted at `/calls`. All require auth.
///
/// ```text
/// POST /                      -> initiate
/// POST /{id}/end              -> end
/// GET  /history               -> history
/// GET  /history/{other_id}    -> history_with
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(calls::initiate))
        .route("/{id}/end", post(calls::end))
        .route("/history", get(calls::history))
        .route("/history/{other_id}", get(calls::history_with))
}
