//! Bootstrap data for an empty database.
//!
//! Mirrors the public test directory at `ldap.forumsys.com`: two org units
//! (scientists and mathematicians) and their members, so a fresh install can
//! log in and administer itself.

use usermgr_core::participant::{ParticipantType, RelationType};
use usermgr_core::roles::{
    ROLE_ADMINISTRATOR, ROLE_PUBLIC, ROLE_USER_ADMINISTRATOR, SYSTEM_PARTICIPANT,
};

use crate::models::participant::{CreateParticipant, Participant};
use crate::models::participant_relation::CreateParticipantRelation;
use crate::repositories::{ParticipantRelationRepo, ParticipantRepo};
use crate::{DbPool, DbTransaction};

const SCIENTISTS: &[(&str, &str)] = &[
    ("einstein", "Einstein"),
    ("newton", "Newton"),
    ("galileo", "Galileo"),
    ("tesla", "Tesla"),
];

const MATHEMATICIANS: &[(&str, &str)] = &[
    ("riemann", "Riemann"),
    ("gauss", "Gauss"),
    ("euler", "Euler"),
    ("euclid", "Euclid"),
];

/// Seed the bootstrap participants unless the `participants` table has rows.
///
/// Returns `true` if data was inserted. Runs in a single transaction.
pub async fn initialize_if_empty(pool: &DbPool) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let count: i64 = with_conn!(&mut tx, |conn| {
        sqlx::query_scalar("SELECT COUNT(*) FROM participants")
            .fetch_one(conn)
            .await
    })?;
    if count > 0 {
        tracing::debug!(count, "Participants present, skipping seed");
        return Ok(false);
    }

    tracing::info!("Initialize database");
    create_participants(&mut tx).await?;
    tx.commit().await?;
    Ok(true)
}

async fn create_participants(tx: &mut DbTransaction) -> Result<(), sqlx::Error> {
    ParticipantRepo::create(
        tx,
        &participant(SYSTEM_PARTICIPANT, "SYSTEM", ParticipantType::System, None),
    )
    .await?;

    let public = ParticipantRepo::add_role(
        tx,
        participant(ROLE_PUBLIC, "PUBLIC", ParticipantType::Role, Some("The PUBLIC role.")),
    )
    .await?;
    let admin = ParticipantRepo::add_role(
        tx,
        participant(
            ROLE_ADMINISTRATOR,
            "Administrator",
            ParticipantType::Role,
            Some("Can add users, orgs and roles"),
        ),
    )
    .await?;
    let user_admin = ParticipantRepo::add_role(
        tx,
        participant(
            ROLE_USER_ADMINISTRATOR,
            "User Administrator",
            ParticipantType::Role,
            Some("Can add users, orgs and roles"),
        ),
    )
    .await?;

    let mathematicians = ParticipantRepo::add_org(
        tx,
        participant("MATHEMATICIANS", "Mathematicians", ParticipantType::OrgUnit, None),
    )
    .await?;
    let scientists = ParticipantRepo::add_org(
        tx,
        participant("SCIENTISTS", "Scientists", ParticipantType::OrgUnit, None),
    )
    .await?;

    for (name, display_name) in SCIENTISTS {
        let scientist = ParticipantRepo::add_user(
            tx,
            participant(name, display_name, ParticipantType::Human, None),
        )
        .await?;
        relate(tx, &scientist, RelationType::MemberOf, &scientists).await?;
        relate(tx, &scientist, RelationType::Grant, &public).await?;
        if scientist.name == "EINSTEIN" {
            relate(tx, &scientist, RelationType::Grant, &admin).await?;
            relate(tx, &scientist, RelationType::Grant, &user_admin).await?;
        }
    }

    for (name, display_name) in MATHEMATICIANS {
        let mathematician = ParticipantRepo::add_user(
            tx,
            participant(name, display_name, ParticipantType::Human, None),
        )
        .await?;
        relate(tx, &mathematician, RelationType::Grant, &public).await?;
        relate(tx, &mathematician, RelationType::MemberOf, &mathematicians).await?;
    }
    Ok(())
}

fn participant(
    name: &str,
    display_name: &str,
    participant_type: ParticipantType,
    description: Option<&str>,
) -> CreateParticipant {
    CreateParticipant {
        name: name.to_uppercase(),
        display_name: display_name.to_string(),
        description: description.map(str::to_string),
        email: None,
        participant_type,
        state: None,
        external_reference: None,
        hashed_password: None,
        created_by: SYSTEM_PARTICIPANT.to_string(),
    }
}

async fn relate(
    tx: &mut DbTransaction,
    from: &Participant,
    relation_type: RelationType,
    to: &Participant,
) -> Result<(), sqlx::Error> {
    let input = CreateParticipantRelation::new(from.id, relation_type, to.id, SYSTEM_PARTICIPANT);
    ParticipantRelationRepo::create_if_missing(tx, &input).await?;
    Ok(())
}
