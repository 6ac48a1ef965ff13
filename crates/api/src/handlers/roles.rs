//! Handlers for the `/roles` resource (participants of type `ROLE`).
//!
//! `PUBLIC` is implicit and never listed. `ADMINISTRATOR` is only listed for
//! sessions allowed to read `all_roles`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use usermgr_core::participant::{ParticipantType, RelationType};
use usermgr_core::permissions::{ACTION_READ, OBJECT_ROLES};
use usermgr_core::roles::{ROLE_ADMINISTRATOR, ROLE_PUBLIC};
use usermgr_core::types::DbId;
use usermgr_db::models::participant::{Participant, ParticipantWithRelations};
use usermgr_db::repositories::ParticipantRelationRepo;

use super::participants::{
    create_of_type, find_of_type, get_of_type, list_of_type, update_of_type,
    CreateParticipantRequest, UpdateParticipantRequest,
};
use crate::error::AppResult;
use crate::middleware::rbac::{has_access, require_access, RequireRegistered};
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Policy object that reveals the `ADMINISTRATOR` role in listings.
const OBJECT_ALL_ROLES: &str = "all_roles";

/// GET /api/v1/roles
pub async fn list_roles(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    let roles = list_of_type(&state, &user, ParticipantType::Role, params.include_inactive).await?;
    let show_admin = has_access(&state, &user, OBJECT_ALL_ROLES, ACTION_READ).await?;
    let roles = roles
        .into_iter()
        .filter(|r| r.name != ROLE_PUBLIC)
        .filter(|r| show_admin || r.name != ROLE_ADMINISTRATOR)
        .collect();
    Ok(Json(DataResponse { data: roles }))
}

/// GET /api/v1/roles/{id}
pub async fn get_role(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ParticipantWithRelations>>> {
    let found = get_of_type(&state, &user, ParticipantType::Role, id).await?;
    Ok(Json(DataResponse { data: found }))
}

/// POST /api/v1/roles
pub async fn create_role(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Json(input): Json<CreateParticipantRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Participant>>)> {
    let created = create_of_type(&state, &user, ParticipantType::Role, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// PUT /api/v1/roles/{id}
pub async fn update_role(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateParticipantRequest>,
) -> AppResult<Json<DataResponse<ParticipantWithRelations>>> {
    let updated = update_of_type(&state, &user, ParticipantType::Role, id, input).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// GET /api/v1/roles/{id}/grantees
///
/// Active users and org units holding the role.
pub async fn list_grantees(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    require_access(&state, &user, OBJECT_ROLES, ACTION_READ).await?;
    let mut tx = state.pool.begin().await?;
    let role = find_of_type(&mut tx, ParticipantType::Role, id).await?;
    let grantees = ParticipantRelationRepo::list_incoming(
        &mut tx,
        role.participant.id,
        &[RelationType::Grant],
    )
    .await?
    .into_iter()
    .map(|r| r.participant)
    .collect();
    Ok(Json(DataResponse { data: grantees }))
}
