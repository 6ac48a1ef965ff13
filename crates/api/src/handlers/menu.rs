//! Handler for the `/menu` resource.

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use usermgr_core::error::CoreError;
use usermgr_core::menu::{build_menu, Menu};
use usermgr_core::permissions::Permissions;
use usermgr_core::roles::is_administrator;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub menu: Menu,
    pub permissions: Permissions,
    pub debug: bool,
    pub log_level: String,
}

/// GET /api/v1/menu?menu=&debug=&loglevel=
///
/// The menu for the caller's permissions. `debug=1` adds the Debug entry and
/// evaluates permissions without the policy cache. `loglevel` changes the
/// server's log level and requires the `ADMINISTRATOR` role.
pub async fn get_menu(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<MenuResponse>>> {
    if let Some(level) = params.loglevel.as_deref() {
        if !is_administrator(user.session.roles.iter().map(String::as_str)) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Administrator role required to change the log level".into(),
            )));
        }
        state.log.set_level(level)?;
    }

    let debug = params.debug();
    let permissions = state
        .policy
        .permissions(&user.session.username, &user.session.effective_roles, debug)
        .await?;
    let menu = build_menu(&permissions, debug, params.menu.as_deref());

    Ok(Json(DataResponse {
        data: MenuResponse {
            menu,
            permissions,
            debug,
            log_level: state.log.level().to_string().to_uppercase(),
        },
    }))
}
