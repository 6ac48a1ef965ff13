//! Handlers for the `/relations` resource.
//!
//! Relations are immutable: they are created and deleted, never updated.
//! Writing a relation needs write access to the type of its source
//! participant (`pati1`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use usermgr_core::error::CoreError;
use usermgr_core::participant::{validate_relation, RelationType};
use usermgr_core::permissions::ACTION_WRITE;
use usermgr_core::types::DbId;
use usermgr_db::models::participant::Participant;
use usermgr_db::models::participant_relation::{CreateParticipantRelation, ParticipantRelation};
use usermgr_db::models::relation_view::{ParticipantRelationView, RelationViewFilter};
use usermgr_db::repositories::{ParticipantRelationRepo, ParticipantRepo, RelationViewRepo};
use usermgr_db::DbTransaction;

use super::participants::resource_of;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{require_access, RequireRegistered};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /relations`.
#[derive(Debug, Deserialize)]
pub struct CreateRelationRequest {
    pub pati1_id: DbId,
    pub relation_type: RelationType,
    pub pati2_id: DbId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/relations?participant_id=&relation_type=&p1_pati_type=
///
/// Rows of `participant_relations_v`, both ends resolved.
pub async fn list_relations(
    State(state): State<AppState>,
    RequireRegistered(_user): RequireRegistered,
    Query(filter): Query<RelationViewFilter>,
) -> AppResult<Json<DataResponse<Vec<ParticipantRelationView>>>> {
    let mut tx = state.pool.begin().await?;
    let rows = RelationViewRepo::list(&mut tx, &filter).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/v1/relations
///
/// Create `pati1 --relation_type--> pati2`. Both participants must be active
/// and of types the relation allows. A duplicate edge is a 409.
pub async fn create_relation(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Json(input): Json<CreateRelationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ParticipantRelation>>)> {
    if input.pati1_id == input.pati2_id {
        return Err(AppError::Core(CoreError::Validation(
            "A participant cannot be related to itself".into(),
        )));
    }

    let mut tx = state.pool.begin().await?;
    let pati1 = find_participant(&mut tx, input.pati1_id).await?;
    let pati2 = find_participant(&mut tx, input.pati2_id).await?;
    require_access(&state, &user, resource_of(pati1.participant_type)?, ACTION_WRITE).await?;

    for p in [&pati1, &pati2] {
        if !p.is_active() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "{} {} is not active",
                p.participant_type.label(),
                p.name
            ))));
        }
    }
    validate_relation(pati1.participant_type, input.relation_type, pati2.participant_type)?;

    let create =
        CreateParticipantRelation::new(pati1.id, input.relation_type, pati2.id, user.username());
    let relation = ParticipantRelationRepo::create(&mut tx, &create).await?;
    tx.commit().await?;

    tracing::info!(
        relation_id = relation.id,
        pati1 = %pati1.name,
        relation_type = %relation.relation_type,
        pati2 = %pati2.name,
        created_by = %user.username(),
        "Relation created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: relation })))
}

/// DELETE /api/v1/relations/{id}
pub async fn delete_relation(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;
    let relation = ParticipantRelationRepo::find_by_id(&mut tx, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Relation",
            id,
        }))?;
    let pati1 = find_participant(&mut tx, relation.pati1_id).await?;
    require_access(&state, &user, resource_of(pati1.participant_type)?, ACTION_WRITE).await?;

    ParticipantRelationRepo::delete_by_id(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(
        relation_id = id,
        relation_type = %relation.relation_type,
        deleted_by = %user.username(),
        "Relation deleted",
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn find_participant(tx: &mut DbTransaction, id: DbId) -> AppResult<Participant> {
    ParticipantRepo::find_by_id(tx, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Participant",
            id,
        }))
}
