//! Handler for the `/about` resource.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use usermgr_core::permissions::ACTION_READ;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_access;
use crate::response::DataResponse;
use crate::state::AppState;

const OBJECT_ABOUT: &str = "about";

#[derive(Debug, Serialize)]
pub struct AboutResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub db_engine: &'static str,
    /// `ldap` or `local`.
    pub directory: &'static str,
}

/// GET /api/v1/about
pub async fn get_about(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<AboutResponse>>> {
    require_access(&state, &user, OBJECT_ABOUT, ACTION_READ).await?;
    Ok(Json(DataResponse {
        data: AboutResponse {
            name: "Participant Manager",
            version: env!("CARGO_PKG_VERSION"),
            db_engine: state.pool.engine().as_str(),
            directory: if state.config.ldap.server.is_some() {
                "ldap"
            } else {
                "local"
            },
        },
    }))
}
