use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::sqlite::SqliteConnectOptions;
use usermgr_core::error::CoreError;
use usermgr_db::{ConnectOptions, DbEngine};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against an
/// in-memory SQLite database. In production, override via environment
/// variables or a `.env` file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seed an empty database with the bootstrap participants (default: `true`).
    pub seed: bool,
    pub jwt: JwtConfig,
    pub db: DbConfig,
    pub ldap: LdapConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DB_SEED`              | `true`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let seed = env_flag("DB_SEED", true);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            seed,
            jwt: JwtConfig::from_env(),
            db: DbConfig::from_env(),
            ldap: LdapConfig::from_env(),
            policy: PolicyConfig::from_env(),
            logging: LoggingConfig::from_env(),
        }
    }

    /// Every setting keyed by its environment variable name, for the debug page.
    ///
    /// Secrets are included here; callers filter them with
    /// [`crate::handlers::debug::sanitize_settings`].
    pub fn settings(&self) -> BTreeMap<&'static str, String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        BTreeMap::from([
            ("HOST", self.host.clone()),
            ("PORT", self.port.to_string()),
            ("CORS_ORIGINS", self.cors_origins.join(",")),
            ("REQUEST_TIMEOUT_SECS", self.request_timeout_secs.to_string()),
            ("DB_SEED", self.seed.to_string()),
            ("JWT_SECRET", self.jwt.secret.clone()),
            ("JWT_ACCESS_EXPIRY_MINS", self.jwt.access_token_expiry_mins.to_string()),
            ("DB_ENGINE", self.db.engine.to_string()),
            ("DB_SERVER", opt(&self.db.server)),
            ("DB_PORT", self.db.port.map(|p| p.to_string()).unwrap_or_default()),
            ("DB_DATABASE", opt(&self.db.database)),
            ("DB_USERNAME", opt(&self.db.username)),
            ("DB_PASSWORD", opt(&self.db.password)),
            ("DB_SCHEMA", opt(&self.db.schema)),
            ("DB_SSLMODE", opt(&self.db.sslmode)),
            ("DATABASE_URL", opt(&self.db.url)),
            ("LDAP_SERVER", opt(&self.ldap.server)),
            ("LDAP_USER_DN", self.ldap.user_dn.clone()),
            ("LDAP_BASE_DN", opt(&self.ldap.base_dn)),
            ("POLICY_TTL", self.policy.ttl_secs.to_string()),
            ("CASBIN_MODEL", opt(&self.policy.model_path)),
            ("CASBIN_POLICY", self.policy.policy_path.clone()),
            ("LOGGING_LOG_LEVEL", self.logging.level.clone()),
            ("LOGGING_FORMAT", self.logging.format.clone()),
            ("LOGGER_NAME", self.logging.logger_name.clone()),
        ])
    }
}

/* --------------------------------------------------------------------------
Database
-------------------------------------------------------------------------- */

/// Database connection settings.
///
/// `DATABASE_URL`, when set, takes precedence over the individual `DB_*`
/// parts. `DB_DATABASE=:memory:` with the sqlite engine gives a throwaway
/// in-memory database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub engine: DbEngine,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub schema: Option<String>,
    pub sslmode: Option<String>,
    pub url: Option<String>,
}

const DEFAULT_SQLITE_DATABASE: &str = "usermgr.db";
const SQLITE_MEMORY: &str = ":memory:";

impl DbConfig {
    /// | Env Var        | Default      |
    /// |----------------|--------------|
    /// | `DB_ENGINE`    | `sqlite`     |
    /// | `DB_SERVER`    | --           |
    /// | `DB_PORT`      | --           |
    /// | `DB_DATABASE`  | `usermgr.db` |
    /// | `DB_USERNAME`  | --           |
    /// | `DB_PASSWORD`  | --           |
    /// | `DB_SCHEMA`    | --           |
    /// | `DB_SSLMODE`   | --           |
    /// | `DATABASE_URL` | --           |
    pub fn from_env() -> Self {
        let engine: DbEngine = std::env::var("DB_ENGINE")
            .unwrap_or_else(|_| "sqlite".into())
            .parse()
            .expect("DB_ENGINE must be one of sqlite, postgresql, mssql");

        let port = env_opt("DB_PORT").map(|p| p.parse().expect("DB_PORT must be a valid u16"));

        Self {
            engine,
            server: env_opt("DB_SERVER"),
            port,
            database: env_opt("DB_DATABASE"),
            username: env_opt("DB_USERNAME"),
            password: env_opt("DB_PASSWORD"),
            schema: env_opt("DB_SCHEMA"),
            sslmode: env_opt("DB_SSLMODE"),
            url: env_opt("DATABASE_URL"),
        }
    }

    /// Build driver connection options for the configured engine.
    pub fn connect_options(&self) -> Result<ConnectOptions, CoreError> {
        match self.engine {
            DbEngine::Sqlite => self.sqlite_options(),
            DbEngine::Postgres => self.postgres_options().map(ConnectOptions::Postgres),
            DbEngine::Mssql => Ok(ConnectOptions::Mssql),
        }
    }

    fn sqlite_options(&self) -> Result<ConnectOptions, CoreError> {
        if let Some(url) = &self.url {
            let options = SqliteConnectOptions::from_str(url).map_err(|e| {
                CoreError::Validation(format!("Invalid DATABASE_URL for sqlite: {e}"))
            })?;
            let in_memory = url.contains(SQLITE_MEMORY) || url.contains("mode=memory");
            return Ok(ConnectOptions::Sqlite { options, in_memory });
        }

        let database = self.database.as_deref().unwrap_or(DEFAULT_SQLITE_DATABASE);
        if database == SQLITE_MEMORY {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| CoreError::Internal(e.to_string()))?;
            return Ok(ConnectOptions::Sqlite {
                options,
                in_memory: true,
            });
        }
        Ok(ConnectOptions::Sqlite {
            options: SqliteConnectOptions::new()
                .filename(database)
                .create_if_missing(true),
            in_memory: false,
        })
    }

    fn postgres_options(&self) -> Result<PgConnectOptions, CoreError> {
        let mut options = match &self.url {
            Some(url) => PgConnectOptions::from_str(url).map_err(|e| {
                CoreError::Validation(format!("Invalid DATABASE_URL for postgresql: {e}"))
            })?,
            None => {
                let mut options = PgConnectOptions::new();
                if let Some(server) = &self.server {
                    options = options.host(server);
                }
                if let Some(port) = self.port {
                    options = options.port(port);
                }
                if let Some(database) = &self.database {
                    options = options.database(database);
                }
                if let Some(username) = &self.username {
                    options = options.username(username);
                }
                if let Some(password) = &self.password {
                    options = options.password(password);
                }
                options
            }
        };
        if let Some(sslmode) = &self.sslmode {
            let mode = PgSslMode::from_str(sslmode)
                .map_err(|e| CoreError::Validation(format!("Invalid DB_SSLMODE: {e}")))?;
            options = options.ssl_mode(mode);
        }
        if let Some(schema) = &self.schema {
            options = options.options([("search_path", schema.as_str())]);
        }
        Ok(options)
    }
}

/* --------------------------------------------------------------------------
LDAP
-------------------------------------------------------------------------- */

/// LDAP directory settings. Without `LDAP_SERVER` the service verifies
/// passwords against the local `participants.hashed_password` column.
#[derive(Debug, Clone)]
pub struct LdapConfig {
    /// Directory URL, e.g. `ldap://ldap.forumsys.com:389`.
    pub server: Option<String>,
    /// Bind DN template; `{username}` is replaced by the login name.
    pub user_dn: String,
    /// Search base for the user entry. Defaults to the bound DN itself.
    pub base_dn: Option<String>,
}

impl LdapConfig {
    /// | Env Var        | Default                             |
    /// |----------------|-------------------------------------|
    /// | `LDAP_SERVER`  | --                                  |
    /// | `LDAP_USER_DN` | `uid={username},dc=example,dc=com`  |
    /// | `LDAP_BASE_DN` | --                                  |
    pub fn from_env() -> Self {
        Self {
            server: env_opt("LDAP_SERVER"),
            user_dn: std::env::var("LDAP_USER_DN")
                .unwrap_or_else(|_| "uid={username},dc=example,dc=com".into()),
            base_dn: env_opt("LDAP_BASE_DN"),
        }
    }
}

/* --------------------------------------------------------------------------
Policy
-------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// casbin model file; the built-in model is used when unset.
    pub model_path: Option<String>,
    /// casbin policy CSV.
    pub policy_path: String,
    /// Lifetime of cached access decisions in seconds. `0` disables the cache.
    pub ttl_secs: u64,
}

impl PolicyConfig {
    /// | Env Var         | Default              |
    /// |-----------------|----------------------|
    /// | `CASBIN_MODEL`  | built-in             |
    /// | `CASBIN_POLICY` | `casbin/policy.csv`  |
    /// | `POLICY_TTL`    | `60`                 |
    pub fn from_env() -> Self {
        let ttl_secs: u64 = std::env::var("POLICY_TTL")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("POLICY_TTL must be a valid u64");

        Self {
            model_path: env_opt("CASBIN_MODEL"),
            policy_path: std::env::var("CASBIN_POLICY")
                .unwrap_or_else(|_| "casbin/policy.csv".into()),
            ttl_secs,
        }
    }
}

/* --------------------------------------------------------------------------
Logging
-------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Initial level name, see [`crate::logging::parse_log_level`].
    pub level: String,
    /// `json` for structured output, anything else for human-readable lines.
    pub format: String,
    /// Service name attached to every log line.
    pub logger_name: String,
}

impl LoggingConfig {
    /// | Env Var             | Default   |
    /// |---------------------|-----------|
    /// | `LOGGING_LOG_LEVEL` | `INFO`    |
    /// | `LOGGING_FORMAT`    | `text`    |
    /// | `LOGGER_NAME`       | `usermgr` |
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("LOGGING_LOG_LEVEL").unwrap_or_else(|_| "INFO".into()),
            format: std::env::var("LOGGING_FORMAT").unwrap_or_else(|_| "text".into()),
            logger_name: std::env::var("LOGGER_NAME").unwrap_or_else(|_| "usermgr".into()),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

/// Read an env var, treating empty values and surrounding quotes as unset/noise.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| dequote(v.trim()).to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Strip one pair of matching single or double quotes.
fn dequote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && bytes[0] == bytes[bytes.len() - 1]
        && (bytes[0] == b'"' || bytes[0] == b'\'')
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
