//! Route definitions for the `/presence` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::presence;
use crate::state::AppState;

/// Routes mounted at `/presence`.
///
/// ```text
/// GET /             -> list_online
/// GET /{user_id}    -> get_presence
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(presence::list_online))
        .route("/{user_id}", get(presence::get_presence))
}
