//! Route definitions for the caller's own session and page-level endpoints.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{debug, menu, registration, session};
use crate::state::AppState;

/// Routes merged at the API root.
///
/// ```text
/// GET  /session                -> get_session
/// PUT  /session/roles/{role}   -> toggle_role (admin)
/// GET  /menu                   -> get_menu
/// GET  /debug                  -> get_debug
/// POST /register               -> register
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::get_session))
        .route("/session/roles/{role}", put(session::toggle_role))
        .route("/menu", get(menu::get_menu))
        .route("/debug", get(debug::get_debug))
        .route("/register", post(registration::register))
}
