//! Participant relation entity model and DTOs.
//!
//! Relations are immutable: they are created and deleted, never updated.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use usermgr_core::participant::{normalize_name, RelationType};
use usermgr_core::types::{DbId, Timestamp};

/// Full row from the `participant_relations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParticipantRelation {
    pub id: DbId,
    pub pati1_id: DbId,
    pub pati2_id: DbId,
    #[sqlx(try_from = "String")]
    pub relation_type: RelationType,
    pub created_by: String,
    pub created_datetime: Timestamp,
}

/// DTO for creating a relation `pati1 --relation_type--> pati2`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParticipantRelation {
    pub pati1_id: DbId,
    pub pati2_id: DbId,
    pub relation_type: RelationType,
    #[serde(default)]
    pub created_by: String,
}

impl CreateParticipantRelation {
    pub fn new(pati1_id: DbId, relation_type: RelationType, pati2_id: DbId, created_by: &str) -> Self {
        Self {
            pati1_id,
            pati2_id,
            relation_type,
            created_by: normalize_name(created_by),
        }
    }
}
