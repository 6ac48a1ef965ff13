//! Handlers for the `/admin` resource.
//!
//! All handlers require the `ADMINISTRATOR` role via [`RequireAdmin`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /admin/log-level`.
#[derive(Debug, Deserialize)]
pub struct LogLevelRequest {
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct LogLevelResponse {
    pub level: String,
}

/// POST /api/v1/admin/policy-cache/clear
///
/// Forget cached access decisions and drop expired sessions.
pub async fn clear_policy_cache(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<StatusCode> {
    state.policy.clear_cache().await;
    let purged = state.sessions.purge_expired().await;
    tracing::info!(admin = %admin.username(), purged, "Policy cache cleared by administrator");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/log-level
pub async fn set_log_level(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<LogLevelRequest>,
) -> AppResult<Json<DataResponse<LogLevelResponse>>> {
    let level = state.log.set_level(&input.level)?;
    tracing::info!(admin = %admin.username(), %level, "Log level set by administrator");
    Ok(Json(DataResponse {
        data: LogLevelResponse {
            level: level.to_string().to_uppercase(),
        },
    }))
}
