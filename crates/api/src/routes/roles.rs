//! Route definitions for the `/roles` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// Routes mounted at `/roles`.
///
/// ```text
/// GET  /                 -> list_roles (?include_inactive=)
/// POST /                 -> create_role
/// GET  /{id}             -> get_role
/// PUT  /{id}             -> update_role
/// GET  /{id}/grantees    -> list_grantees
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route("/{id}", get(roles::get_role).put(roles::update_role))
        .route("/{id}/grantees", get(roles::list_grantees))
}
