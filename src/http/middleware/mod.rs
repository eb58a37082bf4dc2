//! Middleware wrapped around every route.
//!
//! Outermost first: request metrics → panic containment → admission gate.

pub mod admission;
pub mod metrics;
pub mod recover;

pub use admission::{admission_middleware, client_identity, AdmissionError, AdmissionState};
pub use metrics::request_metrics;
pub use recover::handle_panic;
