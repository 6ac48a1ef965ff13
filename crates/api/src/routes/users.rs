//! Route definitions for the `/users` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET  /                        -> list_users (?include_inactive=)
/// POST /                        -> create_user
/// GET  /{id}                    -> get_user
/// PUT  /{id}                    -> update_user
/// GET  /{id}/effective-roles    -> effective_roles
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/{id}", get(users::get_user).put(users::update_user))
        .route("/{id}/effective-roles", get(users::effective_roles))
}
