//! Handlers for the `/auth` resource (login, logout).
//!
//! Login verifies the password with the configured directory, then decides
//! from the participant table who the caller is:
//!
//! - an active user gets a session with their roles and org units;
//! - a terminated user is refused;
//! - an unknown manager gets a session that only allows registration;
//! - anyone else is refused.
//!
//! Administrators may log in as another user (`impersonate`) or present a
//! different job title (`title`), to check what that user would see.

use std::collections::BTreeSet;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use usermgr_core::error::CoreError;
use usermgr_core::participant::{normalize_name, ParticipantType};
use usermgr_core::roles::{is_administrator, user_is_manager, ROLE_PUBLIC, SYSTEM_PARTICIPANT};
use usermgr_db::models::participant::{Participant, UpdateParticipant};
use usermgr_db::repositories::ParticipantRepo;
use usermgr_db::DbTransaction;

use super::session::{session_view, SessionView};
use crate::auth::directory::DirectoryUser;
use crate::auth::jwt::generate_access_token;
use crate::auth::session::{Session, UNKNOWN_TITLE};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Log in as this user instead. Administrators only.
    pub impersonate: Option<String>,
    /// Use this job title instead of the directory's. Administrators only.
    pub title: Option<String>,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub session: SessionView,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Verify credentials.
    let profile = state
        .directory
        .authenticate(input.username.trim(), &input.password)
        .await?;
    let login_name = normalize_name(&profile.username);

    let mut tx = state.pool.begin().await?;
    let own_record = ParticipantRepo::find_by_name(&mut tx, ParticipantType::Human, &login_name).await?;

    // 2. Overrides are reserved for administrators.
    let impersonate = input
        .impersonate
        .as_deref()
        .map(normalize_name)
        .filter(|name| !name.is_empty() && *name != login_name);
    let title_override = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if impersonate.is_some() || title_override.is_some() {
        let is_admin = match &own_record {
            Some(p) if p.is_active() => {
                is_administrator(assigned_roles(&mut tx, p.clone()).await?.iter().map(String::as_str))
            }
            _ => false,
        };
        if !is_admin {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only administrators may log in as another user or title".into(),
            )));
        }
    }

    let username = impersonate.clone().unwrap_or_else(|| login_name.clone());
    let title = title_override.or_else(|| profile.title.clone());
    let target = match &impersonate {
        Some(other) => ParticipantRepo::find_by_name(&mut tx, ParticipantType::Human, other).await?,
        None => own_record,
    };

    // 3. Build the session.
    let ttl = state.config.jwt.access_token_expiry_mins;
    let mut session = match target {
        Some(p) if !p.is_active() => {
            tracing::info!(username = %username, "Login refused, account terminated");
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is terminated".into(),
            )));
        }
        Some(p) => {
            let p = if impersonate.is_none() {
                sync_profile(&mut tx, p, &profile).await?
            } else {
                p
            };
            let loaded = ParticipantRepo::load_relations(&mut tx, p).await?;
            let roles = ParticipantRepo::compute_effective_roles(&mut tx, &loaded).await?;
            let effective_roles = state
                .policy
                .roles_of_roles(roles.iter().map(String::as_str))
                .await;

            let mut session = Session::new(&username, &loaded.participant.display_name, ttl);
            session.email = loaded.participant.email.clone();
            session.org_units = loaded.org_unit_names().into_iter().collect();
            session.roles = roles;
            session.effective_roles = effective_roles;
            session
        }
        None if user_is_manager(title.as_deref()) => {
            tracing::info!(username = %username, title = ?title, "Manager without account, registration required");
            let mut session = Session::new(&username, &profile.display_name, ttl);
            if impersonate.is_none() {
                session.email = profile.email.clone();
            }
            session.effective_roles = BTreeSet::from([ROLE_PUBLIC.to_string()]);
            session.must_register = true;
            session
        }
        None => {
            tracing::info!(username = %username, "Login refused, no participant record");
            return Err(AppError::Core(CoreError::Forbidden(
                "You are not authorized to login".into(),
            )));
        }
    };
    tx.commit().await?;

    session.title = title.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    if impersonate.is_some() {
        session.impersonated_by = Some(login_name.clone());
        tracing::warn!(admin = %login_name, username = %username, "Administrator impersonating user");
    }

    // 4. Token.
    let access_token = generate_access_token(&session.username, session.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    state.sessions.insert(session.clone()).await;
    tracing::info!(username = %session.username, must_register = session.must_register, "Login");

    let view = session_view(&state, session, false).await?;
    Ok(Json(AuthResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ttl * 60,
        session: view,
    }))
}

/// POST /api/v1/auth/logout
///
/// Close the caller's session. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    state.sessions.remove(user.session.id).await;
    tracing::info!(username = %user.username(), "Logout");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn assigned_roles(tx: &mut DbTransaction, participant: Participant) -> AppResult<BTreeSet<String>> {
    let loaded = ParticipantRepo::load_relations(tx, participant).await?;
    Ok(ParticipantRepo::compute_effective_roles(tx, &loaded).await?)
}

/// Copy a changed display name or email from the directory onto the record.
///
/// Directory values that fail validation are logged and skipped, never
/// blocking the login.
async fn sync_profile(
    tx: &mut DbTransaction,
    participant: Participant,
    profile: &DirectoryUser,
) -> AppResult<Participant> {
    let mut display_name = Some(profile.display_name.trim())
        .filter(|d| !d.is_empty() && *d != participant.display_name)
        .map(str::to_string);
    if let Some(name) = &display_name {
        let taken = ParticipantRepo::find_by_display_name(tx, ParticipantType::Human, name)
            .await?
            .is_some_and(|other| other.id != participant.id);
        if taken {
            tracing::warn!(participant_id = participant.id, display_name = %name, "Directory display name already in use");
            display_name = None;
        }
    }
    let email = profile
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty() && Some(*e) != participant.email.as_deref())
        .map(str::to_string);
    if display_name.is_none() && email.is_none() {
        return Ok(participant);
    }

    let update = UpdateParticipant {
        display_name,
        email,
        updated_by: SYSTEM_PARTICIPANT.to_string(),
        ..UpdateParticipant::default()
    };
    let update = match update.validated() {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(participant_id = participant.id, error = %e, "Directory profile not synced");
            return Ok(participant);
        }
    };
    match ParticipantRepo::update(tx, participant.id, &update).await? {
        Some(updated) => {
            tracing::info!(participant_id = updated.id, "Profile synced from directory");
            Ok(updated)
        }
        None => Ok(participant),
    }
}
