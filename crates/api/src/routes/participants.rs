//! Route definitions for the `/participants` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::participants;
use crate::state::AppState;

/// Routes mounted at `/participants`.
///
/// ```text
/// GET    /       -> list_participants
/// DELETE /{id}   -> delete_participant
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(participants::list_participants))
        .route("/{id}", delete(participants::delete_participant))
}
