use std::net::SocketAddr;
use std::sync::Arc;

use usermgr_api::auth::directory::{Directory, LdapDirectory, LocalDirectory};
use usermgr_api::auth::session::SessionStore;
use usermgr_api::config::ServerConfig;
use usermgr_api::policy::PolicyEnforcer;
use usermgr_api::router::build_app_router;
use usermgr_api::{logging, state};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let log = logging::init(&config.logging).expect("Failed to initialize logging");
    tracing::info!(
        service = %config.logging.logger_name,
        host = %config.host,
        port = %config.port,
        db_engine = %config.db.engine,
        "Loaded server configuration",
    );

    // --- Database ---
    let options = config
        .db
        .connect_options()
        .expect("Invalid database configuration");

    let pool = usermgr_db::create_pool(options)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    usermgr_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    if let Some(schema) = &config.db.schema {
        usermgr_db::ensure_schema(&pool, schema)
            .await
            .expect("Failed to create database schema");
    }

    usermgr_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    if config.seed {
        let seeded = usermgr_db::seed::initialize_if_empty(&pool)
            .await
            .expect("Failed to seed database");
        tracing::info!(seeded, "Bootstrap data checked");
    }

    // --- Authorization policy ---
    let policy = PolicyEnforcer::from_config(&config.policy)
        .await
        .expect("Failed to load casbin model or policy");
    tracing::info!(
        policy_path = %config.policy.policy_path,
        ttl_secs = config.policy.ttl_secs,
        "Policy loaded",
    );

    // --- Credential directory ---
    let directory: Arc<dyn Directory> = match &config.ldap.server {
        Some(server) => {
            tracing::info!(%server, "Authenticating against LDAP");
            Arc::new(LdapDirectory::new(server.clone(), config.ldap.clone()))
        }
        None => {
            tracing::warn!("LDAP_SERVER not set, authenticating against local password hashes");
            Arc::new(LocalDirectory::new(pool.clone()))
        }
    };

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        directory,
        policy: Arc::new(policy),
        sessions: Arc::new(SessionStore::new()),
        log: Arc::new(log),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
