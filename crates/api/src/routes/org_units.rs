//! Route definitions for the `/org-units` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::org_units;
use crate::state::AppState;

/// Routes mounted at `/org-units`.
///
/// ```text
/// GET  /                  -> list_org_units (?include_inactive=)
/// POST /                  -> create_org_unit
/// GET  /{id}              -> get_org_unit
/// PUT  /{id}              -> update_org_unit
/// GET  /{id}/members      -> list_members
/// GET  /{id}/roles        -> list_roles
/// GET  /{id}/member-of    -> list_member_of
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(org_units::list_org_units).post(org_units::create_org_unit),
        )
        .route(
            "/{id}",
            get(org_units::get_org_unit).put(org_units::update_org_unit),
        )
        .route("/{id}/members", get(org_units::list_members))
        .route("/{id}/roles", get(org_units::list_roles))
        .route("/{id}/member-of", get(org_units::list_member_of))
}
