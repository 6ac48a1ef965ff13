//! User directories that verify login credentials.
//!
//! [`LdapDirectory`] binds against an LDAP server as the user and reads the
//! profile attributes of the bound entry. [`LocalDirectory`] checks the Argon2
//! hash stored on the participant row, for installs without a directory
//! server.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{dn_escape, ldap_escape, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use serde::Serialize;
use usermgr_core::participant::{normalize_name, ParticipantType};
use usermgr_db::repositories::ParticipantRepo;
use usermgr_db::DbPool;

use crate::auth::password::verify_password;
use crate::config::LdapConfig;

/// LDAP result code for a failed simple bind.
const LDAP_INVALID_CREDENTIALS: u32 = 49;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ATTRIBUTES: &[&str] = &["uid", "cn", "displayName", "mail", "title"];

/// Profile of an authenticated user as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryUser {
    /// Login name, upper-cased.
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    /// Job title, used to recognise managers allowed to self-register.
    pub title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Verifies a username and password and returns the user's profile.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryUser, DirectoryError>;
}

/* --------------------------------------------------------------------------
LDAP
-------------------------------------------------------------------------- */

pub struct LdapDirectory {
    server: String,
    config: LdapConfig,
}

impl LdapDirectory {
    pub fn new(server: impl Into<String>, config: LdapConfig) -> Self {
        Self {
            server: server.into(),
            config,
        }
    }

    fn user_dn(&self, username: &str) -> String {
        self.config
            .user_dn
            .replace("{username}", &dn_escape(username))
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        // An empty password makes an anonymous bind succeed.
        if username.trim().is_empty() || password.is_empty() {
            return Err(DirectoryError::InvalidCredentials);
        }
        let login = username.trim().to_lowercase();
        let dn = self.user_dn(&login);

        let settings = LdapConnSettings::new().set_conn_timeout(CONNECT_TIMEOUT);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.server)
            .await
            .map_err(unavailable)?;
        ldap3::drive!(conn);

        let bind = ldap.simple_bind(&dn, password).await.map_err(unavailable)?;
        if bind.rc == LDAP_INVALID_CREDENTIALS {
            tracing::info!(username = %login, "LDAP bind rejected");
            return Err(DirectoryError::InvalidCredentials);
        }
        bind.success().map_err(unavailable)?;

        let (base, scope, filter) = match &self.config.base_dn {
            Some(base) => (
                base.as_str(),
                Scope::Subtree,
                format!("(uid={})", ldap_escape(&login)),
            ),
            None => (dn.as_str(), Scope::Base, "(objectClass=*)".to_string()),
        };
        let (entries, _) = ldap
            .search(base, scope, &filter, ATTRIBUTES.to_vec())
            .await
            .map_err(unavailable)?
            .success()
            .map_err(unavailable)?;

        if let Err(e) = ldap.unbind().await {
            tracing::debug!(error = %e, "LDAP unbind failed");
        }

        let entry = entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .ok_or_else(|| {
                DirectoryError::Unavailable(format!("No directory entry for {login}"))
            })?;

        let attr = |name: &str| {
            entry
                .attrs
                .get(name)
                .and_then(|values| values.first())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let username = attr("uid").unwrap_or(login);
        Ok(DirectoryUser {
            display_name: attr("displayName")
                .or_else(|| attr("cn"))
                .unwrap_or_else(|| username.clone()),
            username: normalize_name(&username),
            email: attr("mail"),
            title: attr("title"),
        })
    }
}

fn unavailable(err: LdapError) -> DirectoryError {
    tracing::warn!(error = %err, "LDAP request failed");
    DirectoryError::Unavailable(err.to_string())
}

/* --------------------------------------------------------------------------
Local
-------------------------------------------------------------------------- */

/// Authenticates `HUMAN` participants against their stored password hash.
///
/// The participant description doubles as the job title.
pub struct LocalDirectory {
    pool: DbPool,
}

impl LocalDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for LocalDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(DirectoryError::InvalidCredentials);
        }
        let db_err = |e: sqlx::Error| DirectoryError::Unavailable(e.to_string());
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let participant = ParticipantRepo::find_by_name(&mut tx, ParticipantType::Human, username)
            .await
            .map_err(db_err)?
            .ok_or(DirectoryError::InvalidCredentials)?;
        tx.rollback().await.map_err(db_err)?;

        let hash = participant
            .hashed_password
            .as_deref()
            .ok_or(DirectoryError::InvalidCredentials)?;
        let verified = verify_password(password, hash).map_err(|e| {
            tracing::error!(participant_id = participant.id, error = %e, "Stored password hash is malformed");
            DirectoryError::InvalidCredentials
        })?;
        if !verified {
            return Err(DirectoryError::InvalidCredentials);
        }

        Ok(DirectoryUser {
            username: participant.name,
            display_name: participant.display_name,
            email: participant.email,
            title: participant.description,
        })
    }
}
