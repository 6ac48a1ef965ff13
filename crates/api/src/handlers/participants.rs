//! Handlers for the `/participants` resource, plus the editing logic shared
//! by the `/users`, `/roles` and `/org-units` resources.
//!
//! An update request carries field changes, an optional state change and
//! optional complete relation lists. Each list is diffed against the stored
//! relations and only the difference is written, all in one transaction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use usermgr_core::diff::compare_lists;
use usermgr_core::error::CoreError;
use usermgr_core::participant::{
    normalize_name, validate_relation, validate_state_change, ParticipantState, ParticipantType,
    RelationType,
};
use usermgr_core::permissions::{ACTION_CREATE, ACTION_READ, ACTION_WRITE};
use usermgr_core::roles::ROLE_PUBLIC;
use usermgr_core::types::DbId;
use usermgr_db::models::participant::{
    CreateParticipant, Participant, ParticipantWithRelations, UpdateParticipant,
};
use usermgr_db::models::participant_relation::CreateParticipantRelation;
use usermgr_db::repositories::{ParticipantRelationRepo, ParticipantRepo};
use usermgr_db::DbTransaction;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{require_access, RequireRegistered};
use crate::response::DataResponse;
use crate::state::AppState;

/// Types listed on the overview page, in display order.
const OVERVIEW_TYPES: [ParticipantType; 3] = [
    ParticipantType::Human,
    ParticipantType::OrgUnit,
    ParticipantType::Role,
];

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`, `POST /roles` and `POST /org-units`.
#[derive(Debug, Deserialize)]
pub struct CreateParticipantRequest {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub external_reference: Option<String>,
    /// Password for the local directory. Users only.
    pub password: Option<String>,
}

/// Request body for `PUT /users/{id}`, `PUT /roles/{id}` and `PUT /org-units/{id}`.
///
/// Relation lists replace the stored relations when present. `PUBLIC` is never
/// part of a submitted or compared role list.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateParticipantRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub external_reference: Option<String>,
    pub password: Option<String>,
    pub state: Option<ParticipantState>,
    /// Reject the update unless the row still has this `update_count`.
    pub expected_update_count: Option<i32>,
    /// Names of granted roles (users and org units).
    pub roles: Option<Vec<String>>,
    /// Names of org units the participant is a member of (users and org units).
    pub org_units: Option<Vec<String>>,
    /// Names of users this user is a proxy of.
    pub proxy_of: Option<Vec<String>>,
    /// Names of users acting as proxy for this user.
    pub proxies: Option<Vec<String>>,
}

impl UpdateParticipantRequest {
    fn has_field_changes(&self) -> bool {
        self.name.is_some()
            || self.display_name.is_some()
            || self.description.is_some()
            || self.email.is_some()
            || self.external_reference.is_some()
            || self.password.is_some()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/participants
///
/// All users, org units and roles, for the overview page.
pub async fn list_participants(
    State(state): State<AppState>,
    RequireRegistered(_user): RequireRegistered,
) -> AppResult<Json<DataResponse<Vec<Participant>>>> {
    let mut tx = state.pool.begin().await?;
    let participants = ParticipantRepo::list_many(&mut tx, &OVERVIEW_TYPES).await?;
    Ok(Json(DataResponse { data: participants }))
}

/// DELETE /api/v1/participants/{id}
///
/// Hard delete. Fails with 409 while other participants still point at it.
pub async fn delete_participant(
    State(state): State<AppState>,
    RequireRegistered(user): RequireRegistered,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let mut tx = state.pool.begin().await?;
    let participant = ParticipantRepo::find_by_id(&mut tx, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Participant",
            id,
        }))?;
    let resource = resource_of(participant.participant_type)?;
    require_access(&state, &user, resource, ACTION_WRITE).await?;

    ParticipantRepo::delete(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(
        participant_id = id,
        name = %participant.name,
        deleted_by = %user.username(),
        "Participant deleted",
    );
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Shared by the typed resources
// ---------------------------------------------------------------------------

/// Policy object of a participant type. `SYSTEM` has none and is never editable.
pub(crate) fn resource_of(participant_type: ParticipantType) -> AppResult<&'static str> {
    participant_type.resource().ok_or_else(|| {
        AppError::Core(CoreError::Forbidden(
            "The SYSTEM participant cannot be managed".into(),
        ))
    })
}

pub(crate) async fn list_of_type(
    state: &AppState,
    user: &AuthUser,
    participant_type: ParticipantType,
    include_inactive: bool,
) -> AppResult<Vec<Participant>> {
    require_access(state, user, resource_of(participant_type)?, ACTION_READ).await?;
    let mut tx = state.pool.begin().await?;
    let participants = ParticipantRepo::list(&mut tx, participant_type, !include_inactive).await?;
    Ok(participants)
}

/// Load a participant of the given type with its relations, or 404.
pub(crate) async fn find_of_type(
    tx: &mut DbTransaction,
    participant_type: ParticipantType,
    id: DbId,
) -> AppResult<ParticipantWithRelations> {
    ParticipantRepo::find_with_relations(tx, id)
        .await?
        .filter(|p| p.participant.participant_type == participant_type)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: participant_type.label(),
            id,
        }))
}

pub(crate) async fn get_of_type(
    state: &AppState,
    user: &AuthUser,
    participant_type: ParticipantType,
    id: DbId,
) -> AppResult<ParticipantWithRelations> {
    require_access(state, user, resource_of(participant_type)?, ACTION_READ).await?;
    let mut tx = state.pool.begin().await?;
    find_of_type(&mut tx, participant_type, id).await
}

/// Create a participant after checking name and display name are free.
///
/// New users are granted `PUBLIC`.
pub(crate) async fn create_of_type(
    state: &AppState,
    user: &AuthUser,
    participant_type: ParticipantType,
    input: CreateParticipantRequest,
) -> AppResult<Participant> {
    require_access(state, user, resource_of(participant_type)?, ACTION_CREATE).await?;

    let hashed_password = password_hash(participant_type, input.password.as_deref())?;
    let create = CreateParticipant {
        name: input.name,
        display_name: input.display_name,
        description: input.description,
        email: input.email,
        participant_type,
        state: None,
        external_reference: input.external_reference,
        hashed_password,
        created_by: user.username().to_string(),
    }
    .validated()?;

    let mut tx = state.pool.begin().await?;
    ensure_unique(&mut tx, participant_type, None, Some(&create.name), Some(&create.display_name))
        .await?;
    let participant = ParticipantRepo::create(&mut tx, &create).await?;
    if participant_type == ParticipantType::Human {
        grant_public(&mut tx, &participant, user.username()).await?;
    }
    tx.commit().await?;

    tracing::info!(
        participant_id = participant.id,
        name = %participant.name,
        participant_type = %participant_type,
        created_by = %user.username(),
        "Participant created",
    );
    Ok(participant)
}

/// Apply field, state and relation changes to a participant.
pub(crate) async fn update_of_type(
    state: &AppState,
    user: &AuthUser,
    participant_type: ParticipantType,
    id: DbId,
    input: UpdateParticipantRequest,
) -> AppResult<ParticipantWithRelations> {
    require_access(state, user, resource_of(participant_type)?, ACTION_WRITE).await?;
    check_relation_fields(participant_type, &input)?;
    let updated_by = user.username().to_string();

    let mut tx = state.pool.begin().await?;
    let current = find_of_type(&mut tx, participant_type, id).await?;
    let mut participant = current.participant.clone();

    let new_state = input.state.filter(|s| *s != participant.state);
    if new_state.is_some() {
        validate_state_change(&participant.name)?;
    }

    // Fields and state go through one UPDATE so the count moves once.
    // Terminating drops every relation.
    if input.has_field_changes() || new_state.is_some() {
        let update = UpdateParticipant {
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            description: input.description.clone(),
            email: input.email.clone(),
            external_reference: input.external_reference.clone(),
            hashed_password: password_hash(participant_type, input.password.as_deref())?,
            state: new_state,
            expected_update_count: input.expected_update_count,
            updated_by: updated_by.clone(),
        }
        .validated()?;
        ensure_unique(
            &mut tx,
            participant_type,
            Some(id),
            update.name.as_deref().filter(|n| *n != participant.name),
            update
                .display_name
                .as_deref()
                .filter(|n| *n != participant.display_name),
        )
        .await?;
        participant = ParticipantRepo::update(&mut tx, id, &update)
            .await?
            .ok_or_else(|| modified_elsewhere(&participant))?;
    } else if input
        .expected_update_count
        .is_some_and(|expected| expected != participant.update_count)
    {
        return Err(modified_elsewhere(&participant));
    }

    // Relation lists.
    if participant.is_active() {
        let edits = [
            (
                input.roles.as_deref(),
                RelationType::Grant,
                ParticipantType::Role,
                Direction::Outgoing,
                current.role_names(),
            ),
            (
                input.org_units.as_deref(),
                RelationType::MemberOf,
                ParticipantType::OrgUnit,
                Direction::Outgoing,
                current.org_unit_names(),
            ),
            (
                input.proxy_of.as_deref(),
                RelationType::ProxyOf,
                ParticipantType::Human,
                Direction::Outgoing,
                current.proxy_of_names(),
            ),
            (
                input.proxies.as_deref(),
                RelationType::ProxyOf,
                ParticipantType::Human,
                Direction::Incoming,
                current.proxy_names(),
            ),
        ];
        for (selected, relation_type, other_type, direction, stored) in edits {
            if let Some(selected) = selected {
                let edit = RelationEdit {
                    relation_type,
                    other_type,
                    direction,
                };
                sync_relations(&mut tx, &participant, &edit, selected, stored, &updated_by)
                    .await?;
            }
        }
    }

    let updated = find_of_type(&mut tx, participant_type, id).await?;
    tx.commit().await?;

    tracing::info!(
        participant_id = id,
        name = %updated.participant.name,
        updated_by = %updated_by,
        "Participant saved",
    );
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// The edited participant is `pati1`.
    Outgoing,
    /// The edited participant is `pati2`.
    Incoming,
}

/// Which relations a submitted name list describes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RelationEdit {
    pub relation_type: RelationType,
    pub other_type: ParticipantType,
    pub direction: Direction,
}

/// Make the stored relations match `selected`, adding and removing the difference.
pub(crate) async fn sync_relations(
    tx: &mut DbTransaction,
    participant: &Participant,
    edit: &RelationEdit,
    selected: &[String],
    stored: Vec<String>,
    updated_by: &str,
) -> AppResult<()> {
    let keep = |name: &String| edit.relation_type != RelationType::Grant || name != ROLE_PUBLIC;
    let selected: Vec<String> = selected
        .iter()
        .map(|n| normalize_name(n))
        .filter(keep)
        .collect();
    let stored: Vec<String> = stored.into_iter().filter(keep).collect();

    let diff = compare_lists(&selected, &stored);
    if diff.is_empty() {
        return Ok(());
    }

    for name in &diff.to_add {
        let other = ParticipantRepo::find_by_name(tx, edit.other_type, name)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!("Unknown {} {name}", edit.other_type.label()))
            })?;
        if !other.is_active() {
            return Err(CoreError::Validation(format!(
                "{} {name} is not active",
                edit.other_type.label()
            ))
            .into());
        }
        if other.id == participant.id {
            return Err(CoreError::Validation(format!(
                "{} cannot be related to itself",
                participant.name
            ))
            .into());
        }
        let (pati1, pati2) = match edit.direction {
            Direction::Outgoing => (participant, &other),
            Direction::Incoming => (&other, participant),
        };
        validate_relation(pati1.participant_type, edit.relation_type, pati2.participant_type)?;
        let input = CreateParticipantRelation::new(pati1.id, edit.relation_type, pati2.id, updated_by);
        ParticipantRelationRepo::create_if_missing(tx, &input).await?;
    }

    for name in &diff.to_remove {
        let Some(other) = ParticipantRepo::find_by_name(tx, edit.other_type, name).await? else {
            continue;
        };
        match edit.direction {
            Direction::Outgoing => {
                ParticipantRelationRepo::delete(tx, participant.id, other.id, edit.relation_type)
                    .await?
            }
            Direction::Incoming => {
                ParticipantRelationRepo::delete_reverse(
                    tx,
                    participant.id,
                    other.id,
                    edit.relation_type,
                )
                .await?
            }
        };
    }

    tracing::info!(
        participant_id = participant.id,
        relation_type = %edit.relation_type,
        added = ?diff.to_add,
        removed = ?diff.to_remove,
        "Relations updated",
    );
    Ok(())
}

/// Grant `PUBLIC` to a participant, if the role exists.
pub(crate) async fn grant_public(
    tx: &mut DbTransaction,
    participant: &Participant,
    created_by: &str,
) -> AppResult<()> {
    grant_role(tx, participant, ROLE_PUBLIC, created_by).await
}

pub(crate) async fn grant_role(
    tx: &mut DbTransaction,
    participant: &Participant,
    role: &str,
    created_by: &str,
) -> AppResult<()> {
    match ParticipantRepo::find_by_name(tx, ParticipantType::Role, role).await? {
        Some(role) => {
            let input =
                CreateParticipantRelation::new(participant.id, RelationType::Grant, role.id, created_by);
            ParticipantRelationRepo::create_if_missing(tx, &input).await?;
        }
        None => tracing::warn!(role, "Role missing, grant skipped"),
    }
    Ok(())
}

/// Reject a name or display name already used by another participant of the type.
pub(crate) async fn ensure_unique(
    tx: &mut DbTransaction,
    participant_type: ParticipantType,
    own_id: Option<DbId>,
    name: Option<&str>,
    display_name: Option<&str>,
) -> AppResult<()> {
    let label = participant_type.label();
    if let Some(name) = name {
        if let Some(existing) = ParticipantRepo::find_by_name(tx, participant_type, name).await? {
            if Some(existing.id) != own_id {
                return Err(CoreError::Conflict(format!("{label} {name} already exists")).into());
            }
        }
    }
    if let Some(display_name) = display_name {
        let existing =
            ParticipantRepo::find_by_display_name(tx, participant_type, display_name).await?;
        if existing.is_some_and(|p| Some(p.id) != own_id) {
            return Err(CoreError::Conflict(format!(
                "{label} with display name '{display_name}' already exists"
            ))
            .into());
        }
    }
    Ok(())
}

fn check_relation_fields(
    participant_type: ParticipantType,
    input: &UpdateParticipantRequest,
) -> AppResult<()> {
    let allowed = |field: &str| match participant_type {
        ParticipantType::Human => true,
        ParticipantType::OrgUnit => matches!(field, "roles" | "org_units"),
        ParticipantType::Role | ParticipantType::System => false,
    };
    let submitted = [
        ("roles", input.roles.is_some()),
        ("org_units", input.org_units.is_some()),
        ("proxy_of", input.proxy_of.is_some()),
        ("proxies", input.proxies.is_some()),
    ];
    for (field, present) in submitted {
        if present && !allowed(field) {
            return Err(AppError::BadRequest(format!(
                "A {} has no {field}",
                participant_type.label()
            )));
        }
    }
    Ok(())
}

fn password_hash(
    participant_type: ParticipantType,
    password: Option<&str>,
) -> AppResult<Option<String>> {
    let Some(password) = password else {
        return Ok(None);
    };
    if participant_type != ParticipantType::Human {
        return Err(AppError::BadRequest(format!(
            "A {} cannot have a password",
            participant_type.label()
        )));
    }
    validate_password_strength(password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let hashed = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    Ok(Some(hashed))
}

fn modified_elsewhere(participant: &Participant) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "{} {} was modified by someone else",
        participant.participant_type.label(),
        participant.name
    )))
}
