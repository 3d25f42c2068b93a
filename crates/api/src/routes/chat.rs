//! Route definitions for the `/chat` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chat`. All require auth.
///
/// ```text
/// POST /messages                   -> send_message
/// GET  /conversations/{other_id}   -> get_conversation
/// GET  /unread/{sender_id}         -> unread_count
/// POST /read                       -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(chat::send_message))
        .route("/conversations/{other_id}", get(chat::get_conversation))
        .route("/unread/{sender_id}", get(chat::unread_count))
        .route("/read", post(chat::mark_read))
}
