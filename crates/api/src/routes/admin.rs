//! Route definitions for the `/admin` resource.

use axum::routing::{post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the `ADMINISTRATOR` role.
///
/// ```text
/// POST /policy-cache/clear   -> clear_policy_cache
/// PUT  /log-level            -> set_log_level
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/policy-cache/clear", post(admin::clear_policy_cache))
        .route("/log-level", put(admin::set_log_level))
}
