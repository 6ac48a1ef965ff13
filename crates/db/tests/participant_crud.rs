//! Integration tests for the participant repository against SQLite.
//!
//! Covers creation and lookup, uniqueness per participant type, partial
//! updates with the update counter, state changes and hard deletes.

use assert_matches::assert_matches;
use sqlx::SqlitePool;
use usermgr_core::participant::{ParticipantState, ParticipantType, RelationType};
use usermgr_db::models::participant::{CreateParticipant, UpdateParticipant};
use usermgr_db::models::participant_relation::CreateParticipantRelation;
use usermgr_db::repositories::{ParticipantKey, ParticipantRelationRepo, ParticipantRepo};
use usermgr_db::{constraint_violation, ConstraintViolation, DbPool};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_participant(name: &str, display_name: &str, kind: ParticipantType) -> CreateParticipant {
    CreateParticipant {
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: None,
        email: None,
        participant_type: kind,
        state: None,
        external_reference: None,
        hashed_password: None,
        created_by: "SYSTEM".to_string(),
    }
    .validated()
    .unwrap()
}

// ---------------------------------------------------------------------------
// Create / find
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_create_and_find(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    let created = ParticipantRepo::add_user(
        &mut tx,
        new_participant("curie", "Curie", ParticipantType::Role),
    )
    .await
    .unwrap();
    assert_eq!(created.name, "CURIE");
    assert_eq!(created.participant_type, ParticipantType::Human);
    assert_eq!(created.state, ParticipantState::Active);
    assert_eq!(created.update_count, 0);

    let by_name = ParticipantRepo::find_by_name(&mut tx, ParticipantType::Human, "curie")
        .await
        .unwrap()
        .expect("found by name");
    assert_eq!(by_name.id, created.id);

    let by_display =
        ParticipantRepo::find_by_display_name(&mut tx, ParticipantType::Human, "Curie")
            .await
            .unwrap();
    assert!(by_display.is_some());

    // Same name under another type is a different participant.
    let missing = ParticipantRepo::find_by_name(&mut tx, ParticipantType::Role, "CURIE")
        .await
        .unwrap();
    assert!(missing.is_none());

    tx.commit().await.unwrap();
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_exists_reports_state(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    let role = ParticipantRepo::add_role(
        &mut tx,
        new_participant("auditor", "Auditor", ParticipantType::Role),
    )
    .await
    .unwrap();

    let state = ParticipantRepo::exists(&mut tx, ParticipantType::Role, ParticipantKey::Id(role.id))
        .await
        .unwrap();
    assert_eq!(state, Some(ParticipantState::Active));

    let wrong_type =
        ParticipantRepo::exists(&mut tx, ParticipantType::Human, ParticipantKey::Id(role.id))
            .await
            .unwrap();
    assert_eq!(wrong_type, None);

    ParticipantRepo::terminate(&mut tx, role.id, "einstein").await.unwrap();
    let state = ParticipantRepo::exists(
        &mut tx,
        ParticipantType::Role,
        ParticipantKey::DisplayName("Auditor"),
    )
    .await
    .unwrap();
    assert_eq!(state, Some(ParticipantState::Terminated));
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_duplicate_name_is_unique_violation(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    ParticipantRepo::add_org(
        &mut tx,
        new_participant("physics", "Physics", ParticipantType::OrgUnit),
    )
    .await
    .unwrap();
    let err = ParticipantRepo::add_org(
        &mut tx,
        new_participant("PHYSICS", "Physics Dept", ParticipantType::OrgUnit),
    )
    .await
    .unwrap_err();
    assert_matches!(constraint_violation(&err), Some(ConstraintViolation::Unique(_)));
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_unknown_participant_type_rejected_by_check(pool: SqlitePool) {
    let err = sqlx::query(
        "INSERT INTO participants (name, display_name, participant_type, created_by)
         VALUES ('X', 'X', 'ROBOT', 'SYSTEM')",
    )
    .execute(&pool)
    .await
    .unwrap_err();
    assert_matches!(constraint_violation(&err), Some(ConstraintViolation::Check(_)));
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_list_orders_by_display_name_and_filters_state(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    for (name, display) in [("zed", "Zed"), ("amy", "Amy"), ("bob", "Bob")] {
        ParticipantRepo::add_user(&mut tx, new_participant(name, display, ParticipantType::Human))
            .await
            .unwrap();
    }
    let bob = ParticipantRepo::find_by_name(&mut tx, ParticipantType::Human, "BOB")
        .await
        .unwrap()
        .unwrap();
    ParticipantRepo::terminate(&mut tx, bob.id, "SYSTEM").await.unwrap();

    let all = ParticipantRepo::list(&mut tx, ParticipantType::Human, false).await.unwrap();
    let names: Vec<_> = all.iter().map(|p| p.display_name.as_str()).collect();
    assert_eq!(names, ["Amy", "Bob", "Zed"]);

    let active = ParticipantRepo::list(&mut tx, ParticipantType::Human, true).await.unwrap();
    let names: Vec<_> = active.iter().map(|p| p.display_name.as_str()).collect();
    assert_eq!(names, ["Amy", "Zed"]);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_update_increments_update_count(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    let mut input = new_participant("bohr", "Bohr", ParticipantType::Human);
    input.email = Some("bohr@example.org".to_string());
    let created = ParticipantRepo::add_user(&mut tx, input).await.unwrap();

    let update = UpdateParticipant {
        display_name: Some("Niels Bohr".to_string()),
        email: Some(String::new()),
        updated_by: "einstein".to_string(),
        ..UpdateParticipant::default()
    }
    .validated()
    .unwrap();
    let updated = ParticipantRepo::update(&mut tx, created.id, &update)
        .await
        .unwrap()
        .expect("row updated");

    assert_eq!(updated.display_name, "Niels Bohr");
    assert_eq!(updated.email, None);
    assert_eq!(updated.update_count, created.update_count + 1);
    assert_eq!(updated.updated_by.as_deref(), Some("EINSTEIN"));
    assert!(updated.updated_datetime.is_some());
    // Untouched fields survive.
    assert_eq!(updated.name, "BOHR");
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_update_with_stale_count_changes_nothing(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    let created = ParticipantRepo::add_user(
        &mut tx,
        new_participant("planck", "Planck", ParticipantType::Human),
    )
    .await
    .unwrap();

    let update = UpdateParticipant {
        description: Some("quanta".to_string()),
        expected_update_count: Some(created.update_count + 5),
        updated_by: "SYSTEM".to_string(),
        ..UpdateParticipant::default()
    };
    let result = ParticipantRepo::update(&mut tx, created.id, &update).await.unwrap();
    assert!(result.is_none());

    let current = ParticipantRepo::find_by_id(&mut tx, created.id).await.unwrap().unwrap();
    assert_eq!(current.update_count, 0);
    assert_eq!(current.description, None);

    let update = UpdateParticipant {
        expected_update_count: Some(0),
        ..update
    };
    let result = ParticipantRepo::update(&mut tx, created.id, &update).await.unwrap();
    assert_eq!(result.unwrap().description.as_deref(), Some("quanta"));
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_update_with_state_counts_once(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    let created = ParticipantRepo::add_user(
        &mut tx,
        new_participant("fermi", "Fermi", ParticipantType::Human),
    )
    .await
    .unwrap();
    let role = ParticipantRepo::add_role(
        &mut tx,
        new_participant("physicist", "Physicist", ParticipantType::Role),
    )
    .await
    .unwrap();
    ParticipantRelationRepo::create(
        &mut tx,
        &CreateParticipantRelation::new(created.id, RelationType::Grant, role.id, "SYSTEM"),
    )
    .await
    .unwrap();

    let update = UpdateParticipant {
        description: Some("neutrons".to_string()),
        state: Some(ParticipantState::Terminated),
        expected_update_count: Some(0),
        updated_by: "SYSTEM".to_string(),
        ..UpdateParticipant::default()
    };
    let updated = ParticipantRepo::update(&mut tx, created.id, &update)
        .await
        .unwrap()
        .expect("row updated");

    assert_eq!(updated.state, ParticipantState::Terminated);
    assert_eq!(updated.description.as_deref(), Some("neutrons"));
    assert_eq!(updated.update_count, 1);
    let outgoing = ParticipantRelationRepo::list_outgoing(&mut tx, created.id, &[])
        .await
        .unwrap();
    assert!(outgoing.is_empty());
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_set_state_round_trip(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();

    let created = ParticipantRepo::add_user(
        &mut tx,
        new_participant("dirac", "Dirac", ParticipantType::Human),
    )
    .await
    .unwrap();

    let terminated = ParticipantRepo::terminate(&mut tx, created.id, "SYSTEM")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(terminated.state, ParticipantState::Terminated);
    assert_eq!(terminated.update_count, 1);

    let active = ParticipantRepo::activate(&mut tx, created.id, "SYSTEM")
        .await
        .unwrap()
        .unwrap();
    assert!(active.is_active());
    assert_eq!(active.update_count, 2);
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_null_state_reads_as_active(pool: SqlitePool) {
    sqlx::query(
        "INSERT INTO participants (name, display_name, participant_type, state, created_by)
         VALUES ('LEGACY', 'Legacy', 'HUMAN', NULL, 'SYSTEM')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let legacy = ParticipantRepo::find_by_name(&mut tx, ParticipantType::Human, "LEGACY")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(legacy.state, ParticipantState::Active);
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_delete_missing_returns_false(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    assert!(!ParticipantRepo::delete(&mut tx, 999_999).await.unwrap());
}
