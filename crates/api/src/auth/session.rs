//! Server-side login sessions.
//!
//! A session holds everything resolved at login: the roles assigned through
//! the database, the effective role set used for policy checks (which an
//! administrator may narrow or widen from the sidebar) and the registration
//! flag for managers without an account.

use std::collections::{BTreeSet, HashMap};

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use usermgr_core::types::Timestamp;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    /// Upper-cased participant name the session acts as.
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    /// Job title from the directory, or `unknown`.
    pub title: String,
    /// Roles granted directly, through org units and through proxies.
    pub roles: BTreeSet<String>,
    /// Roles used for access checks.
    pub effective_roles: BTreeSet<String>,
    pub org_units: BTreeSet<String>,
    /// Set for managers who logged in without a participant record.
    pub must_register: bool,
    /// Administrator who opened this session on behalf of `username`.
    pub impersonated_by: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Session {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>, ttl_mins: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            display_name: display_name.into(),
            email: None,
            title: UNKNOWN_TITLE.to_string(),
            roles: BTreeSet::new(),
            effective_roles: BTreeSet::new(),
            org_units: BTreeSet::new(),
            must_register: false,
            impersonated_by: None,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_mins),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Title recorded when the directory reports none.
pub const UNKNOWN_TITLE: &str = "unknown";

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new session. Expired sessions are dropped on the way.
    pub async fn insert(&self, session: Session) {
        tracing::debug!(session_id = %session.id, username = %session.username, "Session opened");
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session.id, session);
    }

    /// Live session by id. Expired sessions are treated as absent.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|s| !s.is_expired())
            .cloned()
    }

    /// Apply `f` to a live session and return the updated copy.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Option<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).filter(|s| !s.is_expired())?;
        f(session);
        Some(session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Option<Session> {
        self.sessions.write().await.remove(&id)
    }

    /// Drop expired sessions, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
