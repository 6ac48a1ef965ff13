//! Repository for the `participant_relations` table.

use chrono::Utc;
use usermgr_core::participant::RelationType;
use usermgr_core::types::DbId;

use crate::models::participant::RelatedParticipant;
use crate::models::participant_relation::{CreateParticipantRelation, ParticipantRelation};
use crate::repositories::participant_repo::PREFIXED_COLUMNS;
use crate::DbTransaction;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, pati1_id, pati2_id, relation_type, created_by, created_datetime";

/// Provides create/read/delete operations for relations.
pub struct ParticipantRelationRepo;

impl ParticipantRelationRepo {
    /// Insert a relation, returning the created row.
    ///
    /// Fails with a unique violation if the same edge already exists.
    pub async fn create(
        tx: &mut DbTransaction,
        input: &CreateParticipantRelation,
    ) -> Result<ParticipantRelation, sqlx::Error> {
        let query = format!(
            "INSERT INTO participant_relations
                (pati1_id, pati2_id, relation_type, created_by, created_datetime)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let now = Utc::now();
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, ParticipantRelation>(&query)
                .bind(input.pati1_id)
                .bind(input.pati2_id)
                .bind(input.relation_type.as_str())
                .bind(&input.created_by)
                .bind(now)
                .fetch_one(conn)
                .await
        })
    }

    /// Insert a relation unless the same edge exists. Returns `None` for a duplicate.
    pub async fn create_if_missing(
        tx: &mut DbTransaction,
        input: &CreateParticipantRelation,
    ) -> Result<Option<ParticipantRelation>, sqlx::Error> {
        let query = format!(
            "INSERT INTO participant_relations
                (pati1_id, pati2_id, relation_type, created_by, created_datetime)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (pati1_id, pati2_id, relation_type) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let now = Utc::now();
        let created = with_conn!(tx, |conn| {
            sqlx::query_as::<_, ParticipantRelation>(&query)
                .bind(input.pati1_id)
                .bind(input.pati2_id)
                .bind(input.relation_type.as_str())
                .bind(&input.created_by)
                .bind(now)
                .fetch_optional(conn)
                .await
        })?;
        if created.is_none() {
            tracing::debug!(
                pati1_id = input.pati1_id,
                pati2_id = input.pati2_id,
                relation_type = %input.relation_type,
                "Relation already exists",
            );
        }
        Ok(created)
    }

    /// Find a relation by internal ID.
    pub async fn find_by_id(
        tx: &mut DbTransaction,
        id: DbId,
    ) -> Result<Option<ParticipantRelation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM participant_relations WHERE id = $1");
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, ParticipantRelation>(&query)
                .bind(id)
                .fetch_optional(conn)
                .await
        })
    }

    /// Whether the edge `pati1 --relation_type--> pati2` exists.
    pub async fn exists(
        tx: &mut DbTransaction,
        pati1_id: DbId,
        pati2_id: DbId,
        relation_type: RelationType,
    ) -> Result<bool, sqlx::Error> {
        let query = "SELECT COUNT(*) FROM participant_relations
                     WHERE pati1_id = $1 AND pati2_id = $2 AND relation_type = $3";
        let count: i64 = with_conn!(tx, |conn| {
            sqlx::query_scalar(query)
                .bind(pati1_id)
                .bind(pati2_id)
                .bind(relation_type.as_str())
                .fetch_one(conn)
                .await
        })?;
        Ok(count > 0)
    }

    /// Outgoing relations of an active participant, with the target participant.
    ///
    /// Relation types:
    /// - `GRANT`: roles granted to the participant
    /// - `MEMBER OF`: org units the participant belongs to
    /// - `PROXY OF`: participants this participant is a proxy for
    pub async fn list_outgoing(
        tx: &mut DbTransaction,
        pati1_id: DbId,
        relation_types: &[RelationType],
    ) -> Result<Vec<RelatedParticipant>, sqlx::Error> {
        let query = format!(
            "SELECT r.relation_type, {PREFIXED_COLUMNS}
             FROM participant_relations r
             JOIN participants src ON src.id = r.pati1_id
             JOIN participants p ON p.id = r.pati2_id
             WHERE r.pati1_id = $1
               AND r.relation_type IN ({types})
               AND (src.state IS NULL OR src.state = 'ACTIVE')
             ORDER BY r.relation_type, p.display_name",
            types = relation_type_list(relation_types),
        );
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, RelatedParticipant>(&query)
                .bind(pati1_id)
                .fetch_all(conn)
                .await
        })
    }

    /// Incoming relations of a participant, with the active source participant.
    ///
    /// Relation types:
    /// - `GRANT`: participants holding this role
    /// - `MEMBER OF`: members of this org unit
    /// - `PROXY OF`: proxies of this participant
    pub async fn list_incoming(
        tx: &mut DbTransaction,
        pati2_id: DbId,
        relation_types: &[RelationType],
    ) -> Result<Vec<RelatedParticipant>, sqlx::Error> {
        let query = format!(
            "SELECT r.relation_type, {PREFIXED_COLUMNS}
             FROM participant_relations r
             JOIN participants p ON p.id = r.pati1_id
             WHERE r.pati2_id = $1
               AND r.relation_type IN ({types})
               AND (p.state IS NULL OR p.state = 'ACTIVE')
             ORDER BY r.relation_type, p.display_name",
            types = relation_type_list(relation_types),
        );
        with_conn!(tx, |conn| {
            sqlx::query_as::<_, RelatedParticipant>(&query)
                .bind(pati2_id)
                .fetch_all(conn)
                .await
        })
    }

    /// Delete the edge `pati1 --relation_type--> pati2`. Returns the number of rows removed.
    pub async fn delete(
        tx: &mut DbTransaction,
        pati1_id: DbId,
        pati2_id: DbId,
        relation_type: RelationType,
    ) -> Result<u64, sqlx::Error> {
        let query = "DELETE FROM participant_relations
                     WHERE pati1_id = $1 AND pati2_id = $2 AND relation_type = $3";
        let affected = with_conn!(tx, |conn| {
            sqlx::query(query)
                .bind(pati1_id)
                .bind(pati2_id)
                .bind(relation_type.as_str())
                .execute(conn)
                .await
                .map(|r| r.rows_affected())
        })?;
        Ok(affected)
    }

    /// Delete the edge `pati1 --relation_type--> pati2` seen from its target.
    pub async fn delete_reverse(
        tx: &mut DbTransaction,
        pati2_id: DbId,
        pati1_id: DbId,
        relation_type: RelationType,
    ) -> Result<u64, sqlx::Error> {
        Self::delete(tx, pati1_id, pati2_id, relation_type).await
    }

    /// Delete a relation by internal ID. Returns `true` if a row was removed.
    pub async fn delete_by_id(tx: &mut DbTransaction, id: DbId) -> Result<bool, sqlx::Error> {
        let query = "DELETE FROM participant_relations WHERE id = $1";
        let affected = with_conn!(tx, |conn| {
            sqlx::query(query)
                .bind(id)
                .execute(conn)
                .await
                .map(|r| r.rows_affected())
        })?;
        Ok(affected > 0)
    }

    /// Delete every relation the participant takes part in, on either side.
    pub async fn delete_all_for_participant(
        tx: &mut DbTransaction,
        participant_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let query = "DELETE FROM participant_relations WHERE pati1_id = $1 OR pati2_id = $1";
        let affected = with_conn!(tx, |conn| {
            sqlx::query(query)
                .bind(participant_id)
                .execute(conn)
                .await
                .map(|r| r.rows_affected())
        })?;
        tracing::debug!(participant_id, affected, "Deleted all relations of participant");
        Ok(affected)
    }
}

/// SQL literal list of relation types. Values come from the closed enum only.
fn relation_type_list(relation_types: &[RelationType]) -> String {
    let types = if relation_types.is_empty() {
        &RelationType::ALL[..]
    } else {
        relation_types
    };
    types
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}
