//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → server.rs (hyper connection, accept loop, drain)
//!     → request.rs (request ID)
//!     → middleware/ (metrics, panic containment, admission gate)
//!     → handlers.rs or a caller-supplied router
//!     → response.rs (JSON error envelope)
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
