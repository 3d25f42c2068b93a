pub mod auth;
pub mod calls;
pub mod chat;
pub mod health;
pub mod presence;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                   WebSocket
///
/// /auth/register                        register (public)
/// /auth/login                           login (public)
/// /auth/logout                          logout (requires auth)
///
/// /chat/messages                        send (POST)
/// /chat/conversations/{other_id}        conversation with a user (GET)
/// /chat/unread/{sender_id}              unread count from a sender (GET)
/// /chat/read                            mark read (POST)
///
/// /calls                                initiate (POST)
/// /calls/{id}/end                       end (POST)
/// /calls/history                        caller's calls (GET)
/// /calls/history/{other_id}             calls with a user (GET)
///
/// /presence                             online user ids (GET)
/// /presence/{user_id}                   one user's presence (GET)
///
/// /users                                directory listing (GET, admin)
/// /users/{id}                           one user (GET)
/// /users/by-username/{username}         lookup by handle (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_handler))
        // Auth
        .nest("/auth", auth::router())
        // Chat
        .nest("/chat", chat::router())
        // Calls
        .nest("/calls", calls::router())
        // Presence
        .nest("/presence", presence::router())
        // User directory
        .nest("/users", users::router())
}
