//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Serve mode:
//!     bind → register services → serve until shutdown.rs resolves
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → stop accepting → drain in-flight calls → return
//! ```

pub mod shutdown;

pub use shutdown::shutdown_signal;
