use std::sync::Arc;

use crate::auth::directory::Directory;
use crate::auth::session::SessionStore;
use crate::config::ServerConfig;
use crate::logging::LogControl;
use crate::policy::PolicyEnforcer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: usermgr_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Credential check used by login.
    pub directory: Arc<dyn Directory>,
    /// casbin enforcer with its decision cache.
    pub policy: Arc<PolicyEnforcer>,
    /// Live login sessions.
    pub sessions: Arc<SessionStore>,
    /// Runtime log level control.
    pub log: Arc<LogControl>,
}
