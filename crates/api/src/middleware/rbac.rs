//! Role-based access control (RBAC) extractors and checks.
//!
//! The extractors wrap [`AuthUser`] and reject sessions that do not meet a
//! fixed requirement. Per-resource permissions go through
//! [`require_access`], which asks the casbin policy.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use usermgr_core::error::CoreError;
use usermgr_core::roles::is_administrator;

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Requires the `ADMINISTRATOR` role among the session's assigned roles.
///
/// Assigned roles are used rather than effective roles so an administrator
/// who toggled the role off in the sidebar can still turn it back on.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_administrator(user.session.roles.iter().map(String::as_str)) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Administrator role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires a session backed by a participant record, i.e. not a manager who
/// still has to register.
pub struct RequireRegistered(pub AuthUser);

impl FromRequestParts<AppState> for RequireRegistered {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.session.must_register {
            return Err(AppError::Core(CoreError::Forbidden(
                "Registration required".into(),
            )));
        }
        Ok(RequireRegistered(user))
    }
}

/// Requires any live session.
///
/// Functionally equivalent to [`AuthUser`] but named explicitly for use in
/// route definitions where the intent should be self-documenting.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}

/// Whether the session may perform `action` on `object`.
pub async fn has_access(
    state: &AppState,
    user: &AuthUser,
    object: &str,
    action: &str,
) -> AppResult<bool> {
    let allowed = state
        .policy
        .check_access(
            &user.session.username,
            &user.session.effective_roles,
            object,
            action,
            false,
        )
        .await?;
    Ok(allowed)
}

/// Reject with 403 unless the session may perform `action` on `object`.
pub async fn require_access(
    state: &AppState,
    user: &AuthUser,
    object: &str,
    action: &str,
) -> AppResult<()> {
    if !has_access(state, user, object, action).await? {
        tracing::info!(
            username = %user.session.username,
            object,
            action,
            "Access denied",
        );
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "You are not allowed to {action} {object}"
        ))));
    }
    Ok(())
}
