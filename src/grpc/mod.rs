//! gRPC service bootstrap.
//!
//! # Data Flow
//! ```text
//! <name> [--port N] [--log-level L]            (serve mode)
//!     → Logger::set_level
//!     → bind 0.0.0.0:N (failure is fatal)
//!     → options.rs applied to the tonic server builder
//!     → grpc.health.v1 + reflection registered
//!     → every ServerFactory binds its services
//!     → serve until shutdown signal
//!
//! <name> run <command> [flags]                  (run mode)
//!     → command.rs: parse flags, call handler directly
//!     → log response, or return the error for exit-code handling
//!     → streaming handlers write to stream.rs LogStream
//! ```
//!
//! # Design Decisions
//! - Run mode calls the same handler code as the gRPC service
//! - Health and reflection are always present, not opt-in per service
//! - Errors bubble up; `execute` is the only place that picks an exit code

pub mod command;
pub mod options;
pub mod server;
pub mod stream;

pub use command::Listener;
pub use options::ServerOption;
pub use server::{GrpcServer, ServerError, ServerFactory, ServiceRegistry};
pub use stream::{ChannelStream, LogStream, StreamSink};
