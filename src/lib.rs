//! JSON API server for the movie catalog.
//!
//! The interesting parts live in request admission (per-client token
//! buckets with idle eviction) and lifecycle control (signal-driven,
//! bounded graceful shutdown). Route handlers are plain axum routers.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{ShutdownCoordinator, ShutdownHandle};
