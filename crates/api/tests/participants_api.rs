//! HTTP-level integration tests for users, roles, org units, relations and
//! participant deletion.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete_auth, get_auth, login, participant_id, post_json_auth, put_json_auth,
    seed_with_passwords, TEST_PASSWORD,
};
use serde_json::Value;
use sqlx::SqlitePool;

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_list_users_requires_permission(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let app = common::build_test_app(pool).await;

    let token = login(app.clone(), "gauss", TEST_PASSWORD).await;
    let response = get_auth(app.clone(), "/api/v1/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "You are not allowed to read users");

    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;
    let response = get_auth(app, "/api/v1/users", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let users = names(&body_json(response).await["data"]);
    assert_eq!(users.len(), 8);
    assert!(users.contains(&"RIEMANN".to_string()));
    assert!(!users.contains(&"SYSTEM".to_string()));
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_create_user_and_duplicate(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let body = serde_json::json!({
        "name": "bohr",
        "display_name": "Niels Bohr",
        "email": "bohr@example.com",
        "password": "complementarity_1927",
    });
    let response = post_json_auth(app.clone(), "/api/v1/users", body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "BOHR");
    assert_eq!(json["data"]["participant_type"], "HUMAN");
    assert_eq!(json["data"]["created_by"], "EINSTEIN");
    assert!(json["data"].get("hashed_password").is_none());
    let id = json["data"]["id"].as_i64().unwrap();

    // New users hold PUBLIC and can log in with the given password.
    let json = body_json(get_auth(app.clone(), &format!("/api/v1/users/{id}"), &token).await).await;
    assert_eq!(names(&json["data"]["roles"]), vec!["PUBLIC"]);
    login(app.clone(), "bohr", "complementarity_1927").await;

    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_create_user_rejects_weak_password(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let body = serde_json::json!({
        "name": "bohr",
        "display_name": "Niels Bohr",
        "password": "short",
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Submitted role lists are diffed against the stored grants; PUBLIC stays.
#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_update_user_roles(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let newton = participant_id(&pool, "HUMAN", "NEWTON").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let uri = format!("/api/v1/users/{newton}");
    let body = serde_json::json!({ "roles": ["user_administrator", "ROLE_WRITE"] });
    let response = put_json_auth(app.clone(), &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut roles = names(&json["data"]["roles"]);
    roles.sort();
    assert_eq!(roles, vec!["PUBLIC", "ROLE_WRITE", "USER_ADMINISTRATOR"]);

    let body = serde_json::json!({ "roles": ["USER_ADMINISTRATOR"] });
    let json = body_json(put_json_auth(app.clone(), &uri, body, &token).await).await;
    let mut roles = names(&json["data"]["roles"]);
    roles.sort();
    assert_eq!(roles, vec!["PUBLIC", "USER_ADMINISTRATOR"]);

    let json = body_json(
        get_auth(app.clone(), &format!("/api/v1/users/{newton}/effective-roles"), &token).await,
    )
    .await;
    let effective = json["data"]["effective"].as_array().unwrap();
    assert!(effective.iter().any(|r| r == "USER_WRITE"));
    assert!(effective.iter().any(|r| r == "ROLE_READ"));
    assert!(!effective.iter().any(|r| r == "ROLE_WRITE"));

    let body = serde_json::json!({ "roles": ["NO_SUCH_ROLE"] });
    let response = put_json_auth(app, &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_update_with_stale_count_conflicts(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let tesla = participant_id(&pool, "HUMAN", "TESLA").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let uri = format!("/api/v1/users/{tesla}");
    let body = serde_json::json!({ "description": "Inventor", "expected_update_count": 0 });
    let response = put_json_auth(app.clone(), &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["description"], "Inventor");
    assert_eq!(json["data"]["update_count"], 1);
    assert_eq!(json["data"]["updated_by"], "EINSTEIN");

    let body = serde_json::json!({ "description": "Engineer", "expected_update_count": 0 });
    let response = put_json_auth(app, &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// One save that edits fields and state counts as a single update.
#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_fields_and_state_in_one_save(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let tesla = participant_id(&pool, "HUMAN", "TESLA").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let uri = format!("/api/v1/users/{tesla}");
    let body = serde_json::json!({
        "description": "Inventor",
        "state": "TERMINATED",
        "expected_update_count": 0,
    });
    let response = put_json_auth(app.clone(), &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["description"], "Inventor");
    assert_eq!(json["data"]["state"], "TERMINATED");
    assert_eq!(json["data"]["update_count"], 1);
    assert_eq!(json["data"]["roles"], serde_json::json!([]));
    assert_eq!(json["data"]["org_units"], serde_json::json!([]));

    let body = serde_json::json!({
        "description": "Engineer",
        "state": "ACTIVE",
        "expected_update_count": 1,
    });
    let response = put_json_auth(app, &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["state"], "ACTIVE");
    assert_eq!(json["data"]["update_count"], 2);
}

/// Terminating a user drops all of its relations and blocks its login.
#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_terminate_user(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let newton = participant_id(&pool, "HUMAN", "NEWTON").await;
    let scientists = participant_id(&pool, "ORG_UNIT", "SCIENTISTS").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let body = serde_json::json!({ "state": "TERMINATED" });
    let response = put_json_auth(app.clone(), &format!("/api/v1/users/{newton}"), body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["state"], "TERMINATED");
    assert_eq!(json["data"]["roles"], serde_json::json!([]));
    assert_eq!(json["data"]["org_units"], serde_json::json!([]));

    let json = body_json(
        get_auth(app.clone(), &format!("/api/v1/org-units/{scientists}/members"), &token).await,
    )
    .await;
    let members = names(&json["data"]);
    assert!(members.contains(&"EINSTEIN".to_string()));
    assert!(!members.contains(&"NEWTON".to_string()));

    // Hidden from the default listing, shown with include_inactive.
    let json = body_json(get_auth(app.clone(), "/api/v1/users", &token).await).await;
    assert!(!names(&json["data"]).contains(&"NEWTON".to_string()));
    let json =
        body_json(get_auth(app.clone(), "/api/v1/users?include_inactive=true", &token).await).await;
    assert!(names(&json["data"]).contains(&"NEWTON".to_string()));

    let body = serde_json::json!({ "username": "newton", "password": TEST_PASSWORD });
    let response = common::post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Roles and org units
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_role_listing_hides_public_and_admin(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let newton = participant_id(&pool, "HUMAN", "NEWTON").await;
    let app = common::build_test_app(pool).await;

    let admin = login(app.clone(), "einstein", TEST_PASSWORD).await;
    let json = body_json(get_auth(app.clone(), "/api/v1/roles", &admin).await).await;
    let roles = names(&json["data"]);
    assert!(roles.contains(&"ADMINISTRATOR".to_string()));
    assert!(!roles.contains(&"PUBLIC".to_string()));

    let body = serde_json::json!({ "roles": ["USER_ADMINISTRATOR"] });
    let response =
        put_json_auth(app.clone(), &format!("/api/v1/users/{newton}"), body, &admin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let user_admin = login(app.clone(), "newton", TEST_PASSWORD).await;
    let json = body_json(get_auth(app, "/api/v1/roles", &user_admin).await).await;
    let roles = names(&json["data"]);
    assert!(roles.contains(&"USER_ADMINISTRATOR".to_string()));
    assert!(!roles.contains(&"ADMINISTRATOR".to_string()));
    assert!(!roles.contains(&"PUBLIC".to_string()));
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_role_grantees_and_create(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let admin_role = participant_id(&pool, "ROLE", "ADMINISTRATOR").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let json = body_json(
        get_auth(app.clone(), &format!("/api/v1/roles/{admin_role}/grantees"), &token).await,
    )
    .await;
    assert_eq!(names(&json["data"]), vec!["EINSTEIN"]);

    let body = serde_json::json!({ "name": "lab_access", "display_name": "Lab Access" });
    let response = post_json_auth(app.clone(), "/api/v1/roles", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["participant_type"], "ROLE");
    let id = json["data"]["id"].as_i64().unwrap();

    // Roles carry no relation lists of their own.
    let body = serde_json::json!({ "org_units": ["SCIENTISTS"] });
    let response = put_json_auth(app, &format!("/api/v1/roles/{id}"), body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_org_unit_roles_flow_to_members(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let mathematicians = participant_id(&pool, "ORG_UNIT", "MATHEMATICIANS").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let uri = format!("/api/v1/org-units/{mathematicians}");
    let body = serde_json::json!({ "roles": ["USER_READ"] });
    let response = put_json_auth(app.clone(), &uri, body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get_auth(app.clone(), &format!("{uri}/roles"), &token).await).await;
    assert_eq!(names(&json["data"]), vec!["USER_READ"]);

    let gauss = login(app.clone(), "gauss", TEST_PASSWORD).await;
    let response = get_auth(app, "/api/v1/users", &gauss).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_relation_lifecycle(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let gauss = participant_id(&pool, "HUMAN", "GAUSS").await;
    let role_read = participant_id(&pool, "ROLE", "ROLE_READ").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    let body = serde_json::json!({
        "pati1_id": gauss,
        "relation_type": "GRANT",
        "pati2_id": role_read,
    });
    let response = post_json_auth(app.clone(), "/api/v1/relations", body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["created_by"], "EINSTEIN");
    let relation_id = json["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(app.clone(), "/api/v1/relations", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let uri = format!("/api/v1/relations?participant_id={gauss}&relation_type=GRANT");
    let json = body_json(get_auth(app.clone(), &uri, &token).await).await;
    let rows = json["data"].as_array().unwrap();
    assert!(rows
        .iter()
        .any(|r| r["p1_name"] == "GAUSS" && r["p2_name"] == "ROLE_READ"));
    assert!(rows.iter().all(|r| r["relation_type"] == "GRANT"));

    let uri = format!("/api/v1/relations/{relation_id}");
    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_relation_rules(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let gauss = participant_id(&pool, "HUMAN", "GAUSS").await;
    let euler = participant_id(&pool, "HUMAN", "EULER").await;
    let role_read = participant_id(&pool, "ROLE", "ROLE_READ").await;
    let app = common::build_test_app(pool).await;

    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;
    let cases = [
        // Self relation.
        serde_json::json!({ "pati1_id": gauss, "relation_type": "PROXY OF", "pati2_id": gauss }),
        // A role cannot be a member of a user.
        serde_json::json!({ "pati1_id": role_read, "relation_type": "MEMBER OF", "pati2_id": gauss }),
    ];
    for body in cases {
        let response = post_json_auth(app.clone(), "/api/v1/relations", body.clone(), &token).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    let body = serde_json::json!({ "pati1_id": gauss, "relation_type": "PROXY OF", "pati2_id": euler });
    let response = post_json_auth(app.clone(), "/api/v1/relations", body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let euclid = login(app.clone(), "euclid", TEST_PASSWORD).await;
    let response = post_json_auth(app, "/api/v1/relations", body, &euclid).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_participant_overview(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "riemann", TEST_PASSWORD).await;

    let json = body_json(get_auth(app, "/api/v1/participants", &token).await).await;
    let all = names(&json["data"]);
    assert!(all.contains(&"RIEMANN".to_string()));
    assert!(all.contains(&"SCIENTISTS".to_string()));
    assert!(all.contains(&"PUBLIC".to_string()));
    assert!(!all.contains(&"SYSTEM".to_string()));
}

#[sqlx::test(migrations = "../db/migrations/sqlite")]
async fn test_delete_participant(pool: SqlitePool) {
    seed_with_passwords(&pool).await;
    let scientists = participant_id(&pool, "ORG_UNIT", "SCIENTISTS").await;
    let system = participant_id(&pool, "SYSTEM", "SYSTEM").await;
    let app = common::build_test_app(pool).await;
    let token = login(app.clone(), "einstein", TEST_PASSWORD).await;

    // Still referenced by its members.
    let response =
        delete_auth(app.clone(), &format!("/api/v1/participants/{scientists}"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response =
        delete_auth(app.clone(), &format!("/api/v1/participants/{system}"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = serde_json::json!({ "name": "hilbert", "display_name": "Hilbert" });
    let json = body_json(post_json_auth(app.clone(), "/api/v1/users", body, &token).await).await;
    let id = json["data"]["id"].as_i64().unwrap();
    let response = delete_auth(app.clone(), &format!("/api/v1/participants/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(app, &format!("/api/v1/users/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
