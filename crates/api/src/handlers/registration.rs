//! Handler for `/register`: managers without a participant record create
//! their own account.

use std::collections::BTreeSet;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use usermgr_core::error::CoreError;
use usermgr_core::participant::{normalize_name, ParticipantType};
use usermgr_core::roles::{is_administrator, ROLE_PUBLIC, ROLE_USER_READ};
use usermgr_db::models::participant::{CreateParticipant, Participant};
use usermgr_db::repositories::ParticipantRepo;

use super::participants::{ensure_unique, grant_public, grant_role};
use crate::auth::session::UNKNOWN_TITLE;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Defaults to the session's username. Only administrators may name
    /// someone else.
    pub username: Option<String>,
    pub display_name: String,
    pub email: String,
    /// Job title, stored as the description. Defaults to the session's title.
    pub title: Option<String>,
}

/// POST /api/v1/register
///
/// Create a user granted `PUBLIC` and `USER_READ`. The registering manager's
/// session is upgraded in place.
pub async fn register(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Participant>>)> {
    let session = &user.session;
    let is_admin = is_administrator(session.roles.iter().map(String::as_str));
    if !session.must_register && !is_admin {
        return Err(AppError::Core(CoreError::Forbidden(
            "You already have an account".into(),
        )));
    }

    let username = input
        .username
        .as_deref()
        .map(normalize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| session.username.clone());
    let for_self = username == session.username;
    if !for_self && !is_admin {
        return Err(AppError::Core(CoreError::Forbidden(
            "You cannot create an account for someone else".into(),
        )));
    }
    if input.email.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation("email is required".into())));
    }

    let title = input
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| Some(session.title.clone()).filter(|t| t != UNKNOWN_TITLE));
    let create = CreateParticipant {
        name: username,
        display_name: input.display_name,
        description: title,
        email: Some(input.email),
        participant_type: ParticipantType::Human,
        state: None,
        external_reference: None,
        hashed_password: None,
        created_by: session.username.clone(),
    }
    .validated()?;

    let mut tx = state.pool.begin().await?;
    ensure_unique(
        &mut tx,
        ParticipantType::Human,
        None,
        Some(&create.name),
        Some(&create.display_name),
    )
    .await?;
    let participant = ParticipantRepo::create(&mut tx, &create).await?;
    grant_public(&mut tx, &participant, &session.username).await?;
    grant_role(&mut tx, &participant, ROLE_USER_READ, &session.username).await?;
    tx.commit().await?;

    tracing::info!(
        participant_id = participant.id,
        name = %participant.name,
        registered_by = %session.username,
        "User registered",
    );

    if for_self && session.must_register {
        let roles = BTreeSet::from([ROLE_PUBLIC.to_string(), ROLE_USER_READ.to_string()]);
        let effective = state
            .policy
            .roles_of_roles(roles.iter().map(String::as_str))
            .await;
        let display_name = participant.display_name.clone();
        let email = participant.email.clone();
        state
            .sessions
            .update(session.id, move |s| {
                s.must_register = false;
                s.display_name = display_name;
                s.email = email;
                s.roles = roles;
                s.effective_roles = effective;
            })
            .await;
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: participant })))
}
