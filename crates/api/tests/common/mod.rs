//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use tracing::level_filters::LevelFilter;

use usermgr_api::auth::directory::{
    Directory, DirectoryError, DirectoryUser, LocalDirectory,
};
use usermgr_api::auth::jwt::JwtConfig;
use usermgr_api::auth::password::hash_password;
use usermgr_api::auth::session::SessionStore;
use usermgr_api::config::{DbConfig, LdapConfig, LoggingConfig, PolicyConfig, ServerConfig};
use usermgr_api::logging::LogControl;
use usermgr_api::policy::PolicyEnforcer;
use usermgr_api::router::build_app_router;
use usermgr_api::state::AppState;
use usermgr_db::{DbEngine, DbPool};

/// Password set on every seeded user by [`seed_with_passwords`].
pub const TEST_PASSWORD: &str = "relativity_1905!";

/// Build a test `ServerConfig` with safe defaults.
///
/// Policy files come from the crate's own `casbin/` directory.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        seed: true,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        db: DbConfig {
            engine: DbEngine::Sqlite,
            server: None,
            port: None,
            database: None,
            username: Some("sa".to_string()),
            password: Some("hunter2".to_string()),
            schema: None,
            sslmode: None,
            url: None,
        },
        ldap: LdapConfig {
            server: None,
            user_dn: "uid={username},dc=example,dc=com".to_string(),
            base_dn: None,
        },
        policy: PolicyConfig {
            model_path: None,
            policy_path: concat!(env!("CARGO_MANIFEST_DIR"), "/casbin/policy.csv").to_string(),
            ttl_secs: 60,
        },
        logging: LoggingConfig {
            level: "INFO".to_string(),
            format: "text".to_string(),
            logger_name: "usermgr-test".to_string(),
        },
    }
}

/// Seed the bootstrap participants and give every user [`TEST_PASSWORD`].
pub async fn seed_with_passwords(pool: &SqlitePool) {
    usermgr_db::seed::initialize_if_empty(&DbPool::Sqlite(pool.clone()))
        .await
        .expect("seeding should succeed");
    let hashed = hash_password(TEST_PASSWORD).expect("hashing should succeed");
    sqlx::query("UPDATE participants SET hashed_password = $1 WHERE participant_type = 'HUMAN'")
        .bind(hashed)
        .execute(pool)
        .await
        .expect("password update should succeed");
}

/// Build the full application router against the local password directory.
pub async fn build_test_app(pool: SqlitePool) -> Router {
    let db = DbPool::Sqlite(pool);
    let directory = Arc::new(LocalDirectory::new(db.clone()));
    build_test_app_with_directory(db, directory).await
}

/// Build the full application router with a custom directory.
///
/// Uses the same router builder as `main.rs`, so tests exercise the
/// production middleware stack.
pub async fn build_test_app_with_directory(pool: DbPool, directory: Arc<dyn Directory>) -> Router {
    let config = test_config();
    let policy = PolicyEnforcer::from_config(&config.policy)
        .await
        .expect("policy should load");

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        directory,
        policy: Arc::new(policy),
        sessions: Arc::new(SessionStore::new()),
        log: Arc::new(LogControl::detached(LevelFilter::INFO)),
    };
    build_app_router(state, &config)
}

/// A directory that knows exactly one account with a fixed title.
///
/// Stands in for LDAP when a test needs someone the database does not know.
pub struct StaticDirectory {
    pub username: &'static str,
    pub password: &'static str,
    pub title: &'static str,
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        if !username.eq_ignore_ascii_case(self.username) || password != self.password {
            return Err(DirectoryError::InvalidCredentials);
        }
        Ok(DirectoryUser {
            username: self.username.to_uppercase(),
            display_name: "Marie Curie".to_string(),
            email: Some("curie@example.com".to_string()),
            title: Some(self.title.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Collect a response body into a `serde_json::Value`.
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not valid JSON")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: Value) -> Response {
    send_json(app, "POST", uri, json, None).await
}

pub async fn post_json_auth(app: Router, uri: &str, json: Value, token: &str) -> Response {
    send_json(app, "POST", uri, json, Some(token)).await
}

pub async fn put_json_auth(app: Router, uri: &str, json: Value, token: &str) -> Response {
    send_json(app, "PUT", uri, json, Some(token)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    json: Value,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(json.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Log in and return the access token. Panics unless the login succeeds.
pub async fn login(app: Router, username: &str, password: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK, "login of {username} should succeed");
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("access_token must be a string")
        .to_string()
}

/// Look up a participant id by type and name via SQL.
pub async fn participant_id(pool: &SqlitePool, participant_type: &str, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM participants WHERE participant_type = $1 AND name = $2")
        .bind(participant_type)
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("participant should exist")
}
