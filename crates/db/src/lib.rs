//! Persistence for participants and their relations.
//!
//! One repository implementation serves SQLite and PostgreSQL: [`DbPool`] and
//! [`DbTransaction`] wrap the driver-specific sqlx types and the internal
//! `with_conn!` macro expands each query body once per driver. SQL Server is
//! part of the schema contract (see [`schema`]) but has no runtime driver.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool, Transaction};
use usermgr_core::error::CoreError;

/// Run `$body` with `$conn` bound to the driver connection behind a
/// `&mut DbTransaction`. The body is compiled once per driver.
macro_rules! with_conn {
    ($tx:expr, |$conn:ident| $body:expr) => {
        match $tx {
            $crate::DbTransaction::Sqlite(tx) => {
                let $conn: &mut sqlx::SqliteConnection = &mut **tx;
                $body
            }
            $crate::DbTransaction::Postgres(tx) => {
                let $conn: &mut sqlx::PgConnection = &mut **tx;
                $body
            }
        }
    };
}

pub mod models;
pub mod repositories;
pub mod schema;
pub mod seed;

/// Maximum pool size for server databases.
const MAX_CONNECTIONS: u32 = 20;

/* --------------------------------------------------------------------------
Engine selection
-------------------------------------------------------------------------- */

/// Database engine named by `DB_ENGINE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    Sqlite,
    Postgres,
    /// DDL only; connecting reports a configuration error.
    Mssql,
}

impl DbEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgresql",
            Self::Mssql => "mssql",
        }
    }
}

impl FromStr for DbEngine {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            other => Err(CoreError::Validation(format!(
                "Unknown DB_ENGINE '{other}'. Valid engines: sqlite, postgresql, mssql"
            ))),
        }
    }
}

impl std::fmt::Display for DbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver-specific connection options, built by the API configuration layer.
#[derive(Debug, Clone)]
pub enum ConnectOptions {
    Sqlite {
        options: SqliteConnectOptions,
        /// `:memory:` databases live only as long as their single connection.
        in_memory: bool,
    },
    Postgres(PgConnectOptions),
    Mssql,
}

/* --------------------------------------------------------------------------
Pool and transaction
-------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl DbPool {
    pub fn engine(&self) -> DbEngine {
        match self {
            Self::Sqlite(_) => DbEngine::Sqlite,
            Self::Postgres(_) => DbEngine::Postgres,
        }
    }

    /// Start a transaction. Every repository call runs inside one.
    pub async fn begin(&self) -> Result<DbTransaction, sqlx::Error> {
        Ok(match self {
            Self::Sqlite(pool) => DbTransaction::Sqlite(pool.begin().await?),
            Self::Postgres(pool) => DbTransaction::Postgres(pool.begin().await?),
        })
    }

    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }
}

impl From<SqlitePool> for DbPool {
    fn from(pool: SqlitePool) -> Self {
        Self::Sqlite(pool)
    }
}

impl From<PgPool> for DbPool {
    fn from(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }
}

/// An open transaction. Dropping it without [`DbTransaction::commit`] rolls back.
pub enum DbTransaction {
    Sqlite(Transaction<'static, sqlx::Sqlite>),
    Postgres(Transaction<'static, sqlx::Postgres>),
}

impl DbTransaction {
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        match self {
            Self::Sqlite(tx) => tx.commit().await,
            Self::Postgres(tx) => tx.commit().await,
        }
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        match self {
            Self::Sqlite(tx) => tx.rollback().await,
            Self::Postgres(tx) => tx.rollback().await,
        }
    }
}

/// Create a connection pool for the configured engine.
///
/// In-memory SQLite databases are per connection, so their pool is capped at
/// a single connection that is never recycled.
pub async fn create_pool(options: ConnectOptions) -> Result<DbPool, sqlx::Error> {
    match options {
        ConnectOptions::Sqlite { options, in_memory } => {
            let mut pool_opts = SqlitePoolOptions::new();
            if in_memory {
                pool_opts = pool_opts
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None);
            } else {
                pool_opts = pool_opts.max_connections(MAX_CONNECTIONS);
            }
            Ok(DbPool::Sqlite(pool_opts.connect_with(options).await?))
        }
        ConnectOptions::Postgres(opts) => Ok(DbPool::Postgres(
            PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect_with(opts)
                .await?,
        )),
        ConnectOptions::Mssql => Err(sqlx::Error::Configuration(
            "SQL Server is supported as schema DDL only; use sqlite or postgresql at runtime"
                .into(),
        )),
    }
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    match pool {
        DbPool::Sqlite(p) => sqlx::query("SELECT 1").execute(p).await.map(|_| ()),
        DbPool::Postgres(p) => sqlx::query("SELECT 1").execute(p).await.map(|_| ()),
    }
}

/// Apply the engine's migration set (tables, constraints, view).
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    match pool {
        DbPool::Sqlite(p) => sqlx::migrate!("./migrations/sqlite").run(p).await,
        DbPool::Postgres(p) => sqlx::migrate!("./migrations/postgres").run(p).await,
    }
}

/// Create the PostgreSQL schema named by `DB_SCHEMA` if it is missing.
///
/// The schema must be on the connection `search_path` (set by the config
/// layer) for migrations to land in it.
pub async fn ensure_schema(pool: &DbPool, schema: &str) -> Result<(), sqlx::Error> {
    let DbPool::Postgres(p) = pool else {
        return Ok(());
    };
    if !schema::is_valid_identifier(schema) {
        return Err(sqlx::Error::Configuration(
            format!("Invalid DB_SCHEMA '{schema}'").into(),
        ));
    }
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .execute(p)
        .await?;
    Ok(())
}

/* --------------------------------------------------------------------------
Constraint classification
-------------------------------------------------------------------------- */

/// A database constraint violation, normalized across drivers.
///
/// The payload is the constraint name when the driver reports one
/// (PostgreSQL), otherwise the driver's message (SQLite).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique(String),
    Check(String),
    ForeignKey(String),
    NotNull(String),
}

/// Classify `err` as a constraint violation, if it is one.
pub fn constraint_violation(err: &sqlx::Error) -> Option<ConstraintViolation> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let detail = db_err
        .constraint()
        .map(str::to_string)
        .unwrap_or_else(|| db_err.message().to_string());

    use sqlx::error::ErrorKind;
    match db_err.kind() {
        ErrorKind::UniqueViolation => Some(ConstraintViolation::Unique(detail)),
        ErrorKind::CheckViolation => Some(ConstraintViolation::Check(detail)),
        ErrorKind::ForeignKeyViolation => Some(ConstraintViolation::ForeignKey(detail)),
        ErrorKind::NotNullViolation => Some(ConstraintViolation::NotNull(detail)),
        _ => None,
    }
}
