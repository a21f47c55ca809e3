//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Own the process-wide severity threshold
//! - Configure log level at runtime by name
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Level names are matched case-sensitively against `LEVELS`

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, Layer, Registry};

/// Every accepted severity name, most severe first.
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Level used when nothing else is configured.
pub const DEFAULT_LEVEL: &str = "info";

/// Errors raised while configuring the logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("not a valid log level: {0:?} (expected one of: {levels})", levels = all_levels())]
    InvalidLevel(String),

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to reload log level: {0}")]
    Reload(#[from] reload::Error),
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Initial severity name (see [`LEVELS`]).
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Render all severity names for help text, e.g. `error, warn, info, debug, trace`.
pub fn all_levels() -> String {
    LEVELS.join(", ")
}

/// Parse a severity name. Only the exact names in [`LEVELS`] are accepted.
pub fn parse_level(name: &str) -> Result<LevelFilter, LoggerError> {
    match name {
        "error" => Ok(LevelFilter::ERROR),
        "warn" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(LoggerError::InvalidLevel(other.to_string())),
    }
}

fn level_name(level: LevelFilter) -> &'static str {
    LEVELS
        .iter()
        .copied()
        .find(|name| parse_level(name).ok() == Some(level))
        .unwrap_or("off")
}

/// Handle to the process severity threshold.
///
/// Cheap to clone; every clone observes and changes the same threshold.
/// Create one at the composition point (`main`) and pass it down.
#[derive(Clone)]
pub struct Logger {
    current: Arc<ArcSwap<LevelFilter>>,
    reload: Option<reload::Handle<LevelFilter, Registry>>,
}

impl Logger {
    /// Install the global tracing subscriber and return its level handle.
    ///
    /// Fails if the level name is unknown or a global subscriber already exists.
    pub fn init(config: &LoggingConfig) -> Result<Self, LoggerError> {
        let level = parse_level(&config.level)?;
        let (filter, handle) = reload::Layer::new(level);

        let fmt_layer = match config.format {
            LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
            LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(level)),
            reload: Some(handle),
        })
    }

    /// A handle that tracks a threshold without owning a subscriber.
    ///
    /// Used when the embedding application installs its own subscriber.
    pub fn detached(level: LevelFilter) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(level)),
            reload: None,
        }
    }

    /// Current severity threshold.
    pub fn level(&self) -> LevelFilter {
        **self.current.load()
    }

    /// Current severity threshold as one of [`LEVELS`].
    pub fn level_name(&self) -> &'static str {
        level_name(self.level())
    }

    /// Change the threshold by name. Unknown names leave it untouched.
    pub fn set_level(&self, name: &str) -> Result<(), LoggerError> {
        let level = parse_level(name)?;
        if let Some(handle) = &self.reload {
            handle.reload(level)?;
        }
        self.current.store(Arc::new(level));
        tracing::debug!(level = name, "Log level set");
        Ok(())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level_name())
            .field("installed", &self.reload.is_some())
            .finish()
    }
}
