//! Network helpers shared by the gRPC server and the Temporal client.
//!
//! # Data Flow
//! ```text
//! cert/key paths (config or option)
//!     → tls.rs (existence check, PEM validation)
//!     → tonic Identity
//!     → ServerTlsConfig (serve mode) or mTLS credentials (client)
//! ```

pub mod tls;

pub use tls::{load_identity, load_server_tls, TlsError};
