//! Read-only access to the `participant_relations_v` view.

use crate::models::relation_view::{ParticipantRelationView, RelationViewFilter};
use crate::DbTransaction;

const COLUMNS: &str = "id, p1_id, p1_state, p1_name, p1_display_name, p1_pati_type, \
                       relation_type, p2_name, p2_display_name, p2_id, p2_pati_type, \
                       p2_state, created_by, created_datetime";

pub struct RelationViewRepo;

impl RelationViewRepo {
    /// List relations with both ends resolved, ordered by source then target
    /// display name.
    pub async fn list(
        tx: &mut DbTransaction,
        filter: &RelationViewFilter,
    ) -> Result<Vec<ParticipantRelationView>, sqlx::Error> {
        let mut conditions = Vec::new();
        if let Some(relation_type) = filter.relation_type {
            conditions.push(format!("relation_type = '{}'", relation_type.as_str()));
        }
        if let Some(pati_type) = filter.p1_pati_type {
            conditions.push(format!("p1_pati_type = '{}'", pati_type.as_str()));
        }
        if filter.participant_id.is_some() {
            conditions.push("(p1_id = $1 OR p2_id = $1)".to_string());
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT {COLUMNS} FROM participant_relations_v{where_clause}
             ORDER BY p1_display_name, relation_type, p2_display_name"
        );
        with_conn!(tx, |conn| {
            let mut q = sqlx::query_as::<_, ParticipantRelationView>(&query);
            if let Some(id) = filter.participant_id {
                q = q.bind(id);
            }
            q.fetch_all(conn).await
        })
    }
}
