//! Read model for the `participant_relations_v` view.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use usermgr_core::participant::{ParticipantState, ParticipantType, RelationType};
use usermgr_core::types::{DbId, Timestamp};

/// One row of `participant_relations_v`: a relation with both ends resolved.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParticipantRelationView {
    pub id: DbId,
    pub p1_id: DbId,
    #[sqlx(try_from = "Option<String>")]
    pub p1_state: ParticipantState,
    pub p1_name: String,
    pub p1_display_name: String,
    #[sqlx(try_from = "String")]
    pub p1_pati_type: ParticipantType,
    #[sqlx(try_from = "String")]
    pub relation_type: RelationType,
    pub p2_name: String,
    pub p2_display_name: String,
    pub p2_id: DbId,
    #[sqlx(try_from = "String")]
    pub p2_pati_type: ParticipantType,
    #[sqlx(try_from = "Option<String>")]
    pub p2_state: ParticipantState,
    pub created_by: String,
    pub created_datetime: Timestamp,
}

/// Optional filters for listing the view (`?participant_id=&relation_type=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationViewFilter {
    /// Match relations where this participant is on either side.
    pub participant_id: Option<DbId>,
    pub relation_type: Option<RelationType>,
    /// Match relations whose source has this type.
    pub p1_pati_type: Option<ParticipantType>,
}
