//! Fatal error handling.
//!
//! # Data Flow
//! ```text
//! Subsystem error (ServerError, ConnectionError, ...)
//!     → ExitError::Fatal (message, cause, logging hooks)
//!       or ExitError::Other (anything else)
//!     → handle_fatal_error: one log record, exit code
//! ```
//!
//! # Design Decisions
//! - Only the outermost entry point turns an error into an exit code
//! - Structured and plain errors are distinct variants, matched on directly

pub mod fatal;

pub use fatal::{handle_fatal_error, ExitError, FatalError, DEFAULT_MESSAGE};

/// Boxed error used at the edges where callers supply their own error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
