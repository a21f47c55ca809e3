//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → ServerConfig::server_options()    → grpc server builder
//!     → TemporalConfig::client_options()  → temporal connection
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Command-line flags override the file (`--port`, `--log-level`)

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{Config, MetricsConfig, ServerConfig, TemporalConfig, TlsConfig};
pub use validation::{validate_config, ValidationError};
