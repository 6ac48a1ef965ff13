pub mod admin;
pub mod auth;
pub mod health;
pub mod org_units;
pub mod participants;
pub mod relations;
pub mod roles;
pub mod session;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/logout                                     logout
///
/// /session                                         own session, permissions
/// /session/roles/{role}                            toggle role (PUT, admin)
/// /menu                                            menu (?menu=&debug=&loglevel=)
/// /debug                                           session state, settings
/// /register                                        manager self-registration (POST)
/// /about                                           version info
///
/// /participants                                    overview of users, orgs, roles
/// /participants/{id}                               delete
///
/// /users                                           list, create
/// /users/{id}                                      get, update
/// /users/{id}/effective-roles                      assigned and inherited roles
///
/// /roles                                           list, create
/// /roles/{id}                                      get, update
/// /roles/{id}/grantees                             holders of the role
///
/// /org-units                                       list, create
/// /org-units/{id}                                  get, update
/// /org-units/{id}/members                          members
/// /org-units/{id}/roles                            granted roles
/// /org-units/{id}/member-of                        parent org units
///
/// /relations                                       list view rows, create
/// /relations/{id}                                  delete
///
/// /admin/policy-cache/clear                        clear policy cache (POST)
/// /admin/log-level                                 set log level (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (login, logout).
        .nest("/auth", auth::router())
        // Session, menu, debug page, registration.
        .merge(session::router())
        .route("/about", get(handlers::about::get_about))
        // Participant overview and the typed resources.
        .nest("/participants", participants::router())
        .nest("/users", users::router())
        .nest("/roles", roles::router())
        .nest("/org-units", org_units::router())
        .nest("/relations", relations::router())
        // Administration.
        .nest("/admin", admin::router())
}
