//! Route definitions for the `/relations` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::relations;
use crate::state::AppState;

/// Routes mounted at `/relations`.
///
/// ```text
/// GET    /       -> list_relations (?participant_id=&relation_type=&p1_pati_type=)
/// POST   /       -> create_relation
/// DELETE /{id}   -> delete_relation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(relations::list_relations).post(relations::create_relation),
        )
        .route("/{id}", delete(relations::delete_relation))
}
