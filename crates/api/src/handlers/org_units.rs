//! Handlers for the `/org-units` resource (participants of type `ORG_UNIT`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use usermgr_core::participant::{ParticipantType, RelationType};
use usermgr_core::permissions::{ACTION_READ, OBJECT_ORG_UNITS};
use usermgr_core::types::DbId;
use usermgr_db::models::participant::{Participant, ParticipantWithRelations};
use usermgr_db::repositories::ParticipantRelationRepo;

use super::participants::{
    create_of_type, find_of_type, get_of_type, list_of_type, update_of_type,
    CreateParticipantRequest, UpdateParticipantRequest,
};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{require_access, RequireRegistered};
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/org-units
pub async fn list_org_units(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    let orgs =
        list_of_type(&state, &user, ParticipantType::OrgUnit, params.include_inactive).await?;
    Ok(Json(DataResponse { data: orgs }))
}

/// GET /api/v1/org-units/{id}
pub async fn get_org_unit(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ParticipantWithRelations>>> {
    let found = get_of_type(&state, &user, ParticipantType::OrgUnit, id).await?;
    Ok(Json(DataResponse { data: found }))
}

/// POST /api/v1/org-units
pub async fn create_org_unit(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Json(input): Json<CreateParticipantRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Participant>>)> {
    let created = create_of_type(&state, &user, ParticipantType::OrgUnit, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// PUT /api/v1/org-units/{id}
///
/// Update fields, state, granted roles and parent org units.
pub async fn update_org_unit(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateParticipantRequest>,
) -> AppResult<Json<DataResponse<ParticipantWithRelations>>> {
    let updated = update_of_type(&state, &user, ParticipantType::OrgUnit, id, input).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// GET /api/v1/org-units/{id}/members
///
/// Active users and org units that are members of the org unit.
pub async fn list_members(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    require_access(&state, &user, OBJECT_ORG_UNITS, ACTION_READ).await?;
    let mut tx = state.pool.begin().await?;
    let org = find_of_type(&mut tx, ParticipantType::OrgUnit, id).await?;
    let members = ParticipantRelationRepo::list_incoming(
        &mut tx,
        org.participant.id,
        &[RelationType::MemberOf],
    )
    .await?
    .into_iter()
    .map(|r| r.participant)
    .collect();
    Ok(Json(DataResponse { data: members }))
}

/// GET /api/v1/org-units/{id}/roles
///
/// Roles granted to the org unit, and so to every member.
pub async fn list_roles(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    let org = load(&state, &user, id).await?;
    Ok(Json(DataResponse { data: org.roles }))
}

/// GET /api/v1/org-units/{id}/member-of
///
/// Org units this org unit belongs to.
pub async fn list_member_of(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    let org = load(&state, &user, id).await?;
    Ok(Json(DataResponse {
        data: org.org_units,
    }))
}

async fn load(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<ParticipantWithRelations> {
    get_of_type(state, user, ParticipantType::OrgUnit, id).await
}
