//! Handlers for the `/users` resource (participants of type `HUMAN`).

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use usermgr_core::participant::ParticipantType;
use usermgr_core::permissions::{ACTION_READ, OBJECT_USERS};
use usermgr_core::types::DbId;
use usermgr_db::models::participant::{Participant, ParticipantWithRelations};
use usermgr_db::repositories::ParticipantRepo;

use super::participants::{
    create_of_type, find_of_type, get_of_type, list_of_type, update_of_type,
    CreateParticipantRequest, UpdateParticipantRequest,
};
use crate::error::AppResult;
use crate::middleware::rbac::{require_access, RequireRegistered};
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Roles of a user before and after expanding the role hierarchy.
#[derive(Debug, Serialize)]
pub struct EffectiveRolesResponse {
    /// Granted directly, through org units and through proxies.
    pub assigned: BTreeSet<String>,
    /// `assigned` plus every role they include.
    pub effective: BTreeSet<String>,
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    let users = list_of_type(&state, &user, ParticipantType::Human, params.include_inactive).await?;
    Ok(Json(DataResponse { data: users }))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ParticipantWithRelations>>> {
    let found = get_of_type(&state, &user, ParticipantType::Human, id).await?;
    Ok(Json(DataResponse { data: found }))
}

/// POST /api/v1/users
///
/// Create a user. The new user is granted `PUBLIC`.
pub async fn create_user(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Json(input): Json<CreateParticipantRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Participant>>)> {
    let created = create_of_type(&state, &user, ParticipantType::Human, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// PUT /api/v1/users/{id}
///
/// Update fields, state, roles, org units, proxy-of and proxies.
pub async fn update_user(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateParticipantRequest>,
) -> AppResult<Json<DataResponse<ParticipantWithRelations>>> {
    let updated = update_of_type(&state, &user, ParticipantType::Human, id, input).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// GET /api/v1/users/{id}/effective-roles
pub async fn effective_roles(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EffectiveRolesResponse>>> {
    require_access(&state, &user, OBJECT_USERS, ACTION_READ).await?;
    let mut tx = state.pool.begin().await?;
    let found = find_of_type(&mut tx, ParticipantType::Human, id).await?;
    let assigned = ParticipantRepo::compute_effective_roles(&mut tx, &found).await?;
    let effective = state
        .policy
        .roles_of_roles(assigned.iter().map(String::as_str))
        .await;
    Ok(Json(DataResponse {
        data: EffectiveRolesResponse {
            assigned,
            effective,
        },
    }))
}
