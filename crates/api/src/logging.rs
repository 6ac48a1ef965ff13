//! Tracing subscriber setup with a runtime-adjustable level.
//!
//! The level filter sits behind a [`reload`] layer so administrators can
//! change verbosity through `?loglevel=` without a restart.

use std::sync::RwLock;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};
use usermgr_core::error::CoreError;

use crate::config::LoggingConfig;

/// Level names accepted by `?loglevel=` and `LOGGING_LOG_LEVEL`.
///
/// `WARNING` and `CRITICAL` are aliases of `WARN` and `ERROR`.
pub fn parse_log_level(name: &str) -> Result<LevelFilter, CoreError> {
    match name.trim().to_uppercase().as_str() {
        "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Ok(LevelFilter::ERROR),
        other => Err(CoreError::Validation(format!("Unknown loglevel: {other}"))),
    }
}

/// Filter directive for a level. sqlx statement logging stays at `warn`.
fn directive(level: LevelFilter) -> String {
    format!("{level},sqlx=warn")
}

/// Handle to the installed subscriber's level filter.
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    level: RwLock<LevelFilter>,
}

impl LogControl {
    /// A control that only tracks the level, for tests and embedded use.
    pub fn detached(level: LevelFilter) -> Self {
        Self {
            handle: None,
            level: RwLock::new(level),
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level.read().map(|l| *l).unwrap_or(LevelFilter::INFO)
    }

    /// Change the level by name. Returns the level now in effect.
    pub fn set_level(&self, name: &str) -> Result<LevelFilter, CoreError> {
        let level = parse_log_level(name)?;
        if let Some(handle) = &self.handle {
            handle
                .modify(|filter| *filter = EnvFilter::new(directive(level)))
                .map_err(|e| CoreError::Internal(format!("Failed to reload log filter: {e}")))?;
        }
        if let Ok(mut current) = self.level.write() {
            *current = level;
        }
        tracing::info!(%level, "Log level changed");
        Ok(level)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, wins over `LOGGING_LOG_LEVEL`. `LOGGING_FORMAT=json`
/// switches to one JSON object per line.
pub fn init(config: &LoggingConfig) -> Result<LogControl, CoreError> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));
    let (filter, handle) = reload::Layer::new(filter);

    let json = config.is_json();
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(fmt::layer))
        .try_init()
        .map_err(|e| CoreError::Internal(format!("Failed to install log subscriber: {e}")))?;

    Ok(LogControl {
        handle: Some(handle),
        level: RwLock::new(level),
    })
}
