//! Integration tests for participant relations, their delete rules, the
//! relation view and effective role computation.

use assert_matches::assert_matches;
use sqlx::SqlitePool;
use usermgr_core::participant::{ParticipantState, ParticipantType, RelationType};
use usermgr_db::models::participant::{CreateParticipant, Participant};
use usermgr_db::models::participant_relation::CreateParticipantRelation;
use usermgr_db::models::relation_view::RelationViewFilter;
use usermgr_db::repositories::{ParticipantRelationRepo, ParticipantRepo, RelationViewRepo};
use usermgr_db::{constraint_violation, ConstraintViolation, DbPool, DbTransaction};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn add(tx: &mut DbTransaction, name: &str, kind: ParticipantType) -> Participant {
    let input = CreateParticipant {
        name: name.to_string(),
        display_name: name.to_lowercase(),
        description: None,
        email: None,
        participant_type: kind,
        state: None,
        external_reference: None,
        hashed_password: None,
        created_by: "SYSTEM".to_string(),
    };
    ParticipantRepo::create(tx, &input).await.unwrap()
}

async fn relate(tx: &mut DbTransaction, from: &Participant, rel: RelationType, to: &Participant) {
    ParticipantRelationRepo::create(tx, &CreateParticipantRelation::new(from.id, rel, to.id, "SYSTEM"))
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_duplicate_relation(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let user = add(&mut tx, "FERMI", ParticipantType::Human).await;
    let role = add(&mut tx, "PHYSICIST", ParticipantType::Role).await;
    relate(&mut tx, &user, RelationType::Grant, &role).await;

    let input = CreateParticipantRelation::new(user.id, RelationType::Grant, role.id, "SYSTEM");
    let err = ParticipantRelationRepo::create(&mut tx, &input).await.unwrap_err();
    assert_matches!(constraint_violation(&err), Some(ConstraintViolation::Unique(_)));

    let again = ParticipantRelationRepo::create_if_missing(&mut tx, &input).await.unwrap();
    assert!(again.is_none());

    // Same pair with another type is a separate edge.
    let other = CreateParticipantRelation::new(user.id, RelationType::MemberOf, role.id, "SYSTEM");
    assert!(ParticipantRelationRepo::create_if_missing(&mut tx, &other)
        .await
        .unwrap()
        .is_some());
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_unknown_relation_type_rejected_by_check(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let a = add(&mut tx, "A", ParticipantType::Human).await;
    let b = add(&mut tx, "B", ParticipantType::Human).await;
    tx.commit().await.unwrap();

    let DbPool::Sqlite(raw) = &pool else {
        unreachable!("sqlite test pool");
    };
    let err = sqlx::query(
        "INSERT INTO participant_relations (pati1_id, pati2_id, relation_type, created_by)
         VALUES ($1, $2, 'FRIEND OF', 'SYSTEM')",
    )
    .bind(a.id)
    .bind(b.id)
    .execute(raw)
    .await
    .unwrap_err();
    assert_matches!(constraint_violation(&err), Some(ConstraintViolation::Check(_)));
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_deleting_source_cascades(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let user = add(&mut tx, "HEISENBERG", ParticipantType::Human).await;
    let org = add(&mut tx, "PHYSICS", ParticipantType::OrgUnit).await;
    relate(&mut tx, &user, RelationType::MemberOf, &org).await;

    assert!(ParticipantRepo::delete(&mut tx, user.id).await.unwrap());
    let remaining = ParticipantRelationRepo::list_incoming(&mut tx, org.id, &[]).await.unwrap();
    assert!(remaining.is_empty());
    assert!(!ParticipantRelationRepo::exists(&mut tx, user.id, org.id, RelationType::MemberOf)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_deleting_referenced_target_is_rejected(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let user = add(&mut tx, "PAULI", ParticipantType::Human).await;
    let role = add(&mut tx, "EXCLUDER", ParticipantType::Role).await;
    relate(&mut tx, &user, RelationType::Grant, &role).await;

    let err = ParticipantRepo::delete(&mut tx, role.id).await.unwrap_err();
    assert_matches!(constraint_violation(&err), Some(ConstraintViolation::ForeignKey(_)));
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_terminate_removes_all_relations(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let boss = add(&mut tx, "BORN", ParticipantType::Human).await;
    let deputy = add(&mut tx, "JORDAN", ParticipantType::Human).await;
    let role = add(&mut tx, "MATRIX", ParticipantType::Role).await;
    relate(&mut tx, &boss, RelationType::Grant, &role).await;
    relate(&mut tx, &deputy, RelationType::ProxyOf, &boss).await;

    ParticipantRepo::terminate(&mut tx, boss.id, "SYSTEM").await.unwrap();

    assert!(!ParticipantRelationRepo::exists(&mut tx, boss.id, role.id, RelationType::Grant)
        .await
        .unwrap());
    assert!(!ParticipantRelationRepo::exists(&mut tx, deputy.id, boss.id, RelationType::ProxyOf)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_load_relations_skips_inactive(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let user = add(&mut tx, "RUTHERFORD", ParticipantType::Human).await;
    let proxy = add(&mut tx, "GEIGER", ParticipantType::Human).await;
    let org = add(&mut tx, "MANCHESTER", ParticipantType::OrgUnit).await;
    let live_role = add(&mut tx, "NUCLEAR", ParticipantType::Role).await;
    let dead_role = add(&mut tx, "ALCHEMY", ParticipantType::Role).await;
    relate(&mut tx, &user, RelationType::Grant, &live_role).await;
    relate(&mut tx, &user, RelationType::Grant, &dead_role).await;
    relate(&mut tx, &user, RelationType::MemberOf, &org).await;
    relate(&mut tx, &proxy, RelationType::ProxyOf, &user).await;
    ParticipantRepo::set_state(&mut tx, dead_role.id, ParticipantState::Terminated, "SYSTEM")
        .await
        .unwrap();

    let loaded = ParticipantRepo::find_with_relations(&mut tx, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.role_names(), ["NUCLEAR"]);
    assert_eq!(loaded.org_unit_names(), ["MANCHESTER"]);
    assert!(loaded.proxy_of.is_empty());
    assert_eq!(loaded.proxy_names(), ["GEIGER"]);
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_effective_roles_follow_one_level(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let user = add(&mut tx, "MEITNER", ParticipantType::Human).await;
    let boss = add(&mut tx, "HAHN", ParticipantType::Human).await;
    let org = add(&mut tx, "KWI", ParticipantType::OrgUnit).await;
    let parent_org = add(&mut tx, "KWG", ParticipantType::OrgUnit).await;
    let direct = add(&mut tx, "USER_READ", ParticipantType::Role).await;
    let via_org = add(&mut tx, "ROLE_READ", ParticipantType::Role).await;
    let via_proxy = add(&mut tx, "USER_WRITE", ParticipantType::Role).await;
    let via_parent = add(&mut tx, "ADMINISTRATOR", ParticipantType::Role).await;

    relate(&mut tx, &user, RelationType::Grant, &direct).await;
    relate(&mut tx, &user, RelationType::MemberOf, &org).await;
    relate(&mut tx, &user, RelationType::ProxyOf, &boss).await;
    relate(&mut tx, &org, RelationType::Grant, &via_org).await;
    relate(&mut tx, &org, RelationType::MemberOf, &parent_org).await;
    relate(&mut tx, &parent_org, RelationType::Grant, &via_parent).await;
    relate(&mut tx, &boss, RelationType::Grant, &via_proxy).await;

    let loaded = ParticipantRepo::find_with_relations(&mut tx, user.id)
        .await
        .unwrap()
        .unwrap();
    let effective = ParticipantRepo::compute_effective_roles(&mut tx, &loaded)
        .await
        .unwrap();
    let effective: Vec<_> = effective.into_iter().collect();
    assert_eq!(effective, ["ROLE_READ", "USER_READ", "USER_WRITE"]);
}

#[sqlx::test(migrations = "migrations/sqlite")]
async fn test_view_filters_and_coalesces_state(pool: SqlitePool) {
    let pool = DbPool::from(pool);
    let mut tx = pool.begin().await.unwrap();
    let user = add(&mut tx, "CHADWICK", ParticipantType::Human).await;
    let org = add(&mut tx, "CAVENDISH", ParticipantType::OrgUnit).await;
    let role = add(&mut tx, "NEUTRON", ParticipantType::Role).await;
    relate(&mut tx, &user, RelationType::MemberOf, &org).await;
    relate(&mut tx, &org, RelationType::Grant, &role).await;

    let all = RelationViewRepo::list(&mut tx, &RelationViewFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.p1_state == ParticipantState::Active));

    let filter = RelationViewFilter {
        participant_id: Some(org.id),
        relation_type: Some(RelationType::Grant),
        p1_pati_type: None,
    };
    let rows = RelationViewRepo::list(&mut tx, &filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].p1_name, "CAVENDISH");
    assert_eq!(rows[0].p2_name, "NEUTRON");
    assert_eq!(rows[0].p2_pati_type, ParticipantType::Role);
}
