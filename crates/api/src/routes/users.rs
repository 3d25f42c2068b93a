//! Route definitions for the `/users` directory.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET /                        -> list_users (admin)
/// GET /{id}                    -> get_user
/// GET /by-username/{username}  -> get_user_by_username
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/{id}", get(users::get_user))
        .route("/by-username/{username}", get(users::get_user_by_username))
}
