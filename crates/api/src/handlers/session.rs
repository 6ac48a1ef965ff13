//! Handlers for the `/session` resource: the caller's own session and the
//! administrator's role simulation.

use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use usermgr_core::error::CoreError;
use usermgr_core::participant::normalize_name;
use usermgr_core::permissions::Permissions;
use usermgr_core::roles::{is_administrator, ROLE_PUBLIC};

use crate::auth::session::Session;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /session/roles/{role}`.
#[derive(Debug, Deserialize)]
pub struct ToggleRoleRequest {
    pub enabled: bool,
}

/// One role in the administrator's sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleToggle {
    pub name: String,
    pub enabled: bool,
}

/// A session as shown to its owner.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub permissions: Permissions,
    pub is_administrator: bool,
    /// Roles an administrator may switch on or off. Empty for everyone else.
    pub available_roles: Vec<RoleToggle>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/session
pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<SessionView>>> {
    let view = session_view(&state, user.session, false).await?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/session/roles/{role}
///
/// Switch one role of the administrator's own effective role set on or off.
/// Only roles reachable from the assigned roles can be toggled, and `PUBLIC`
/// never.
pub async fn toggle_role(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(role): Path<String>,
    Json(input): Json<ToggleRoleRequest>,
) -> AppResult<Json<DataResponse<SessionView>>> {
    let role = normalize_name(&role);
    let available = toggleable_roles(&state, &user.session).await;
    if !available.contains(&role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Role {role} cannot be toggled"
        ))));
    }

    let session = state
        .sessions
        .update(user.session.id, |s| {
            if input.enabled {
                s.effective_roles.insert(role.clone());
            } else {
                s.effective_roles.remove(&role);
            }
        })
        .await
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Session expired or logged out".into()))
        })?;
    state.policy.clear_cache().await;

    tracing::info!(
        username = %session.username,
        role = %role,
        enabled = input.enabled,
        "Session role toggled",
    );
    let view = session_view(&state, session, false).await?;
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Closure of the assigned roles, without `PUBLIC`.
async fn toggleable_roles(state: &AppState, session: &Session) -> BTreeSet<String> {
    let mut roles = state
        .policy
        .roles_of_roles(session.roles.iter().map(String::as_str))
        .await;
    roles.remove(ROLE_PUBLIC);
    roles
}

/// Resolve permissions and, for administrators, the role toggles.
pub(crate) async fn session_view(
    state: &AppState,
    session: Session,
    bypass_cache: bool,
) -> AppResult<SessionView> {
    let permissions = state
        .policy
        .permissions(&session.username, &session.effective_roles, bypass_cache)
        .await?;
    let is_admin = is_administrator(session.roles.iter().map(String::as_str));
    let available_roles = if is_admin {
        toggleable_roles(state, &session)
            .await
            .into_iter()
            .map(|name| RoleToggle {
                enabled: session.effective_roles.contains(&name),
                name,
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(SessionView {
        session,
        permissions,
        is_administrator: is_admin,
        available_roles,
    })
}
