//! Handler for the `/debug` resource.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use usermgr_core::permissions::{ACTION_READ, OBJECT_SETTINGS};

use super::session::{session_view, SessionView};
use crate::error::AppResult;
use crate::middleware::rbac::{has_access, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

/// Settings whose name contains one of these are never shown.
const SECRET_MARKERS: &[&str] = &["PASSWORD", "SECRET", "KEY", "USERNAME", "CLIENT_ID", "TENANT"];

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub session: SessionView,
    /// Present only for sessions allowed to read `settings`.
    pub settings: Option<BTreeMap<String, String>>,
    pub log_level: String,
    pub open_sessions: usize,
    pub cached_decisions: usize,
}

/// GET /api/v1/debug
///
/// Session state, evaluated without the policy cache, and the non-secret
/// settings.
pub async fn get_debug(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<DebugResponse>>> {
    let settings = if has_access(&state, &user, OBJECT_SETTINGS, ACTION_READ).await? {
        Some(sanitize_settings(state.config.settings()))
    } else {
        None
    };
    let session = session_view(&state, user.session, true).await?;

    Ok(Json(DataResponse {
        data: DebugResponse {
            session,
            settings,
            log_level: state.log.level().to_string().to_uppercase(),
            open_sessions: state.sessions.len().await,
            cached_decisions: state.policy.cache_size().await,
        },
    }))
}

/// Drop every setting whose name marks it as a credential.
pub fn sanitize_settings<K, V>(settings: BTreeMap<K, V>) -> BTreeMap<String, String>
where
    K: AsRef<str>,
    V: Into<String>,
{
    settings
        .into_iter()
        .filter(|(key, _)| {
            let key = key.as_ref().to_uppercase();
            !SECRET_MARKERS.iter().any(|marker| key.contains(marker))
        })
        .map(|(key, value)| (key.as_ref().to_string(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_dropped() {
        let settings = BTreeMap::from([
            ("DB_PASSWORD", "hunter2"),
            ("JWT_SECRET", "s3cret"),
            ("API_KEY", "k"),
            ("DB_USERNAME", "sa"),
            ("AZURE_CLIENT_ID", "id"),
            ("AZURE_TENANT", "t"),
            ("DB_ENGINE", "sqlite"),
            ("POLICY_TTL", "60"),
        ]);
        let clean = sanitize_settings(settings);
        assert_eq!(
            clean.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["DB_ENGINE", "POLICY_TTL"]
        );
    }

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let clean = sanitize_settings(BTreeMap::from([("ldap_password", "x"), ("host", "h")]));
        assert_eq!(clean.len(), 1);
        assert!(clean.contains_key("host"));
    }
}
