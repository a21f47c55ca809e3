//! Helpers for building gRPC services and Temporal clients.

// Entry points
pub mod basic;
pub mod grpc;
pub mod temporal;

// Cross-cutting concerns
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::Config;
pub use errors::{handle_fatal_error, ExitError, FatalError};
pub use grpc::{GrpcServer, Listener};
pub use observability::Logger;
pub use temporal::{new_connection, ClientOption, Connection};
