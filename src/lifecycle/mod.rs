//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections (bounded) → Report outcome
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The coordinator runs beside the accept loop, never inside it
//! - Shutdown has timeout: exceeding it is reported as a fatal error
//! - In-flight requests are never forcibly cancelled

pub mod shutdown;
pub mod signals;

pub use shutdown::{DrainSignal, LifecyclePhase, ShutdownCoordinator, ShutdownError, ShutdownHandle};
pub use signals::{ShutdownSignal, TerminationSignals};
