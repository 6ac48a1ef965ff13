//! Repository for the `participants` table.

use std::collections::BTreeSet;

use chrono::Utc;
use usermgr_core::participant::{ParticipantState, ParticipantType, RelationType};
use usermgr_core::types::DbId;

use crate::models::participant::{
    CreateParticipant, Participant, ParticipantWithRelations, UpdateParticipant,
};
use crate::repositories::ParticipantRelationRepo;
use crate::DbTransaction;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, display_name, description, email, participant_type, state, \
                       external_reference, hashed_password, update_count, created_by, \
                       created_datetime, updated_by, updated_datetime";

/// [`COLUMNS`] qualified with the `p` alias, for joins.
pub(crate) const PREFIXED_COLUMNS: &str =
    "p.id, p.name, p.display_name, p.description, p.email, p.participant_type, p.state, \
     p.external_reference, p.hashed_password, p.update_count, p.created_by, \
     p.created_datetime, p.updated_by, p.updated_datetime";

/// Key column for [`ParticipantRepo::exists`].
#[derive(Debug, Clone, Copy)]
pub enum ParticipantKey<'a> {
    Id(DbId),
    Name(&'a str),
    DisplayName(&'a str),
}

/// Provides CRUD and relation-aware reads for participants.
pub struct ParticipantRepo;

impl ParticipantRepo {
    /// Insert a new participant, returning the created row.
    ///
    /// `input` is expected to be [`CreateParticipant::validated`].
    pub async fn create(
        tx: &mut DbTransaction,
        input: &CreateParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let query = format!(
            "INSERT INTO participants
                (name, display_name, description, email, participant_type, state,
                 external_reference, hashed_password, update_count, created_by, created_datetime)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10)
             RETURNING {COLUMNS}"
        );
        let now = Utc::now();
        let state = input.state.map(|s| s.as_str());
        let participant = with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(&input.name)
                .bind(&input.display_name)
                .bind(&input.description)
                .bind(&input.email)
                .bind(input.participant_type.as_str())
                .bind(state)
                .bind(&input.external_reference)
                .bind(&input.hashed_password)
                .bind(&input.created_by)
                .bind(now)
                .fetch_one(conn)
                .await
        })?;
        tracing::debug!(
            participant_id = participant.id,
            name = %participant.name,
            participant_type = %participant.participant_type,
            "Participant created",
        );
        Ok(participant)
    }

    /// Create a `HUMAN` participant.
    pub async fn add_user(
        tx: &mut DbTransaction,
        input: CreateParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let input = CreateParticipant {
            participant_type: ParticipantType::Human,
            ..input
        };
        Self::create(tx, &input).await
    }

    /// Create a `ROLE` participant.
    pub async fn add_role(
        tx: &mut DbTransaction,
        input: CreateParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let input = CreateParticipant {
            participant_type: ParticipantType::Role,
            ..input
        };
        Self::create(tx, &input).await
    }

    /// Create an `ORG_UNIT` participant.
    pub async fn add_org(
        tx: &mut DbTransaction,
        input: CreateParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let input = CreateParticipant {
            participant_type: ParticipantType::OrgUnit,
            ..input
        };
        Self::create(tx, &input).await
    }

    /// Find a participant by internal ID.
    pub async fn find_by_id(
        tx: &mut DbTransaction,
        id: DbId,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM participants WHERE id = $1");
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(id)
                .fetch_optional(conn)
                .await
        })
    }

    /// Find a participant by type and (upper-cased) name.
    pub async fn find_by_name(
        tx: &mut DbTransaction,
        participant_type: ParticipantType,
        name: &str,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants WHERE participant_type = $1 AND name = $2"
        );
        let name = name.trim().to_uppercase();
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(participant_type.as_str())
                .bind(&name)
                .fetch_optional(conn)
                .await
        })
    }

    /// Find a participant by type and display name (case-sensitive).
    pub async fn find_by_display_name(
        tx: &mut DbTransaction,
        participant_type: ParticipantType,
        display_name: &str,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants WHERE participant_type = $1 AND display_name = $2"
        );
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(participant_type.as_str())
                .bind(display_name.trim())
                .fetch_optional(conn)
                .await
        })
    }

    /// Look up a participant by a key column.
    ///
    /// Returns the participant's state if it exists, `None` otherwise. An `Id`
    /// key only matches participants of the given type.
    pub async fn exists(
        tx: &mut DbTransaction,
        participant_type: ParticipantType,
        key: ParticipantKey<'_>,
    ) -> Result<Option<ParticipantState>, sqlx::Error> {
        let found = match key {
            ParticipantKey::Id(id) => Self::find_by_id(tx, id)
                .await?
                .filter(|p| p.participant_type == participant_type),
            ParticipantKey::Name(name) => Self::find_by_name(tx, participant_type, name).await?,
            ParticipantKey::DisplayName(display_name) => {
                Self::find_by_display_name(tx, participant_type, display_name).await?
            }
        };
        Ok(found.map(|p| p.state))
    }

    /// List participants of one type ordered by display name.
    pub async fn list(
        tx: &mut DbTransaction,
        participant_type: ParticipantType,
        only_active: bool,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let state_filter = if only_active {
            " AND (state IS NULL OR state = 'ACTIVE')"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM participants
             WHERE participant_type = $1{state_filter}
             ORDER BY display_name"
        );
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(participant_type.as_str())
                .fetch_all(conn)
                .await
        })
    }

    /// List participants of several types ordered by type, then display name.
    pub async fn list_many(
        tx: &mut DbTransaction,
        participant_types: &[ParticipantType],
    ) -> Result<Vec<Participant>, sqlx::Error> {
        if participant_types.is_empty() {
            return Ok(Vec::new());
        }
        let types = participant_types
            .iter()
            .map(|t| format!("'{}'", t.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {COLUMNS} FROM participants
             WHERE participant_type IN ({types})
             ORDER BY participant_type, display_name"
        );
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .fetch_all(conn)
                .await
        })
    }

    /// Update a participant. Only non-`None` fields in `input` are applied and
    /// `update_count` is incremented by one, whether or not `input.state` is
    /// set. Moving to `TERMINATED` also removes every relation.
    ///
    /// Returns `None` if no row with the given `id` exists, or if
    /// `input.expected_update_count` no longer matches the row.
    ///
    /// Callers changing the state must reject the `SYSTEM` participant first.
    pub async fn update(
        tx: &mut DbTransaction,
        id: DbId,
        input: &UpdateParticipant,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "UPDATE participants SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                description = CASE WHEN $4 IS NULL THEN description ELSE NULLIF($4, '') END,
                email = CASE WHEN $5 IS NULL THEN email ELSE NULLIF($5, '') END,
                external_reference =
                    CASE WHEN $6 IS NULL THEN external_reference ELSE NULLIF($6, '') END,
                hashed_password = COALESCE($7, hashed_password),
                state = COALESCE($11, state),
                update_count = update_count + 1,
                updated_by = $8,
                updated_datetime = $9
             WHERE id = $1 AND ($10 IS NULL OR update_count = $10)
             RETURNING {COLUMNS}"
        );
        let now = Utc::now();
        let state = input.state.as_ref().map(ParticipantState::as_str);
        let updated = with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(id)
                .bind(&input.name)
                .bind(&input.display_name)
                .bind(&input.description)
                .bind(&input.email)
                .bind(&input.external_reference)
                .bind(&input.hashed_password)
                .bind(&input.updated_by)
                .bind(now)
                .bind(input.expected_update_count)
                .bind(state)
                .fetch_optional(conn)
                .await
        })?;
        if let Some(participant) = &updated {
            if input.state == Some(ParticipantState::Terminated) {
                ParticipantRelationRepo::delete_all_for_participant(tx, participant.id).await?;
            }
            if let Some(state) = input.state {
                tracing::info!(participant_id = id, state = %state, "Participant state changed");
            }
        }
        Ok(updated)
    }

    /// Set the participant's state, counting it as an update.
    ///
    /// Callers must reject state changes of the `SYSTEM` participant first
    /// (see `usermgr_core::participant::validate_state_change`).
    pub async fn set_state(
        tx: &mut DbTransaction,
        id: DbId,
        state: ParticipantState,
        updated_by: &str,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "UPDATE participants SET
                state = $2,
                update_count = update_count + 1,
                updated_by = $3,
                updated_datetime = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let now = Utc::now();
        let updated_by = updated_by.to_uppercase();
        let updated = with_conn!(tx, |conn| {
            sqlx::query_as::<_, Participant>(&query)
                .bind(id)
                .bind(state.as_str())
                .bind(&updated_by)
                .bind(now)
                .fetch_optional(conn)
                .await
        })?;
        if updated.is_some() {
            tracing::info!(participant_id = id, state = %state, "Participant state changed");
        }
        Ok(updated)
    }

    /// Set the state to `TERMINATED` and remove every relation of the participant.
    pub async fn terminate(
        tx: &mut DbTransaction,
        id: DbId,
        updated_by: &str,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let updated = Self::set_state(tx, id, ParticipantState::Terminated, updated_by).await?;
        if updated.is_some() {
            ParticipantRelationRepo::delete_all_for_participant(tx, id).await?;
        }
        Ok(updated)
    }

    /// Set the state to `ACTIVE`.
    pub async fn activate(
        tx: &mut DbTransaction,
        id: DbId,
        updated_by: &str,
    ) -> Result<Option<Participant>, sqlx::Error> {
        Self::set_state(tx, id, ParticipantState::Active, updated_by).await
    }

    /// Hard-delete a participant. Relations where it is `pati1` go with it;
    /// relations where it is `pati2` make the delete fail.
    ///
    /// Returns `true` if the row was removed.
    pub async fn delete(tx: &mut DbTransaction, id: DbId) -> Result<bool, sqlx::Error> {
        let query = "DELETE FROM participants WHERE id = $1";
        let affected = with_conn!(tx, |conn| {
            sqlx::query(query)
                .bind(id)
                .execute(conn)
                .await
                .map(|r| r.rows_affected())
        })?;
        Ok(affected > 0)
    }

    /// Attach the participant's active relations.
    pub async fn load_relations(
        tx: &mut DbTransaction,
        participant: Participant,
    ) -> Result<ParticipantWithRelations, sqlx::Error> {
        let outgoing = ParticipantRelationRepo::list_outgoing(tx, participant.id, &[]).await?;
        let incoming =
            ParticipantRelationRepo::list_incoming(tx, participant.id, &[RelationType::ProxyOf])
                .await?;

        let mut loaded = ParticipantWithRelations {
            participant,
            roles: Vec::new(),
            org_units: Vec::new(),
            proxy_of: Vec::new(),
            proxies: incoming.into_iter().map(|r| r.participant).collect(),
        };
        for related in outgoing {
            if !related.participant.is_active() {
                continue;
            }
            match related.relation_type {
                RelationType::Grant => loaded.roles.push(related.participant),
                RelationType::MemberOf => loaded.org_units.push(related.participant),
                RelationType::ProxyOf => loaded.proxy_of.push(related.participant),
            }
        }
        Ok(loaded)
    }

    /// Find by ID and attach relations.
    pub async fn find_with_relations(
        tx: &mut DbTransaction,
        id: DbId,
    ) -> Result<Option<ParticipantWithRelations>, sqlx::Error> {
        match Self::find_by_id(tx, id).await? {
            Some(p) => Ok(Some(Self::load_relations(tx, p).await?)),
            None => Ok(None),
        }
    }

    /// Roles in effect for a participant.
    ///
    /// The union of roles granted directly, roles granted to its org units and
    /// roles granted to the participants it is a proxy of. Only one level is
    /// followed: grants of an org unit's own org units are not inherited.
    pub async fn compute_effective_roles(
        tx: &mut DbTransaction,
        participant: &ParticipantWithRelations,
    ) -> Result<BTreeSet<String>, sqlx::Error> {
        let mut effective: BTreeSet<String> =
            participant.roles.iter().map(|r| r.name.clone()).collect();

        for source in participant.org_units.iter().chain(&participant.proxy_of) {
            let grants =
                ParticipantRelationRepo::list_outgoing(tx, source.id, &[RelationType::Grant])
                    .await?;
            effective.extend(
                grants
                    .into_iter()
                    .filter(|g| g.participant.is_active())
                    .map(|g| g.participant.name),
            );
        }
        Ok(effective)
    }
}
