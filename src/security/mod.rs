//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http::middleware::admission (extract client IP)
//!     → rate_limit.rs (per-IP token bucket, created on first sight)
//!     → Pass to route handlers, or 429
//!
//! Background:
//!     eviction.rs (periodically drop clients idle past the threshold)
//! ```

pub mod eviction;
pub mod rate_limit;

pub use eviction::EvictionSweeper;
pub use rate_limit::{ClientEntry, ClientSnapshot, ClientTable, TokenBucket};
