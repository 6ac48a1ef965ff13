//! The persisted contract: table names, view columns and per-dialect DDL.
//!
//! SQLite and PostgreSQL DDL is applied through `sqlx::migrate!`. The SQL
//! Server scripts are shipped for DBAs to run by hand (`GO` separated).

use crate::DbEngine;

pub const PARTICIPANTS_TABLE: &str = "participants";
pub const RELATIONS_TABLE: &str = "participant_relations";
pub const RELATIONS_VIEW: &str = "participant_relations_v";

/// Output columns of `participant_relations_v`, in order.
pub const RELATIONS_VIEW_COLUMNS: &[&str] = &[
    "id",
    "p1_id",
    "p1_state",
    "p1_name",
    "p1_display_name",
    "p1_pati_type",
    "relation_type",
    "p2_name",
    "p2_display_name",
    "p2_id",
    "p2_pati_type",
    "p2_state",
    "created_by",
    "created_datetime",
];

/// Named constraints every dialect must declare.
pub const CONSTRAINT_NAMES: &[&str] = &[
    "participants_ak1",
    "participants_ak2",
    "participants_chk1",
    "participants_chk2",
    "participant_relations_ak1",
    "participant_relations_chk1",
];

const SQLITE_DDL: &[&str] = &[
    include_str!("../migrations/sqlite/20250301000001_create_participants_table.sql"),
    include_str!("../migrations/sqlite/20250301000002_create_participant_relations_table.sql"),
    include_str!("../migrations/sqlite/20250301000003_create_participant_relations_view.sql"),
];

const POSTGRES_DDL: &[&str] = &[
    include_str!("../migrations/postgres/20250301000001_create_participants_table.sql"),
    include_str!("../migrations/postgres/20250301000002_create_participant_relations_table.sql"),
    include_str!("../migrations/postgres/20250301000003_create_participant_relations_view.sql"),
];

const MSSQL_DDL: &[&str] = &[
    include_str!("../schema/mssql/001_create_participants_table.sql"),
    include_str!("../schema/mssql/002_create_participant_relations_table.sql"),
    include_str!("../schema/mssql/003_create_participant_relations_view.sql"),
];

/// DDL scripts for `engine`, in application order.
pub fn ddl(engine: DbEngine) -> &'static [&'static str] {
    match engine {
        DbEngine::Sqlite => SQLITE_DDL,
        DbEngine::Postgres => POSTGRES_DDL,
        DbEngine::Mssql => MSSQL_DDL,
    }
}

/// Plain SQL identifier: a letter or `_`, then letters, digits or `_`.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    ident.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
