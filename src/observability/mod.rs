//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     LoggingConfig → logging.rs (install subscriber, reloadable level)
//!     --log-level flag → Logger::set_level
//!
//! Runtime:
//!     All subsystems → tracing macros → fmt layer (pretty or JSON)
//!     Fatal errors   → event.rs (LogEvent built up, emitted once)
//!     Connections    → metrics.rs (prefixed counters, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - One severity threshold per process, owned by the `Logger` handle
//! - The handle is passed explicitly to whoever needs to change it
//! - Metrics go through the `metrics` facade so the recorder is swappable

pub mod event;
pub mod logging;
pub mod metrics;

pub use event::LogEvent;
pub use logging::{all_levels, LogFormat, Logger, LoggerError, LoggingConfig, LEVELS};
pub use metrics::{install_prometheus, MetricsError, MetricsHandler};
