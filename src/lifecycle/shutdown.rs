//! Shutdown coordination for the API server.
//!
//! The coordinator runs as its own task for the whole process lifetime:
//!
//! ```text
//! Idle ──spawn──▶ Listening ──signal──▶ Draining ──idle in time──▶ Stopped
//!                     │                     └──grace elapsed──────▶ Failed
//!                     └──signal source error──────────────────────▶ Failed
//! ```
//!
//! On a signal it flips the drain signal (the accept loop stops and open
//! connections finish their current request and close), then waits for the
//! connection tracker to reach zero, bounded by the grace period. In-flight
//! handlers are never cancelled; the outcome is handed to the entry point
//! through [`ShutdownHandle::outcome`].

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use crate::lifecycle::signals::ShutdownSignal;
use crate::net::connection::ConnectionTracker;

/// Process lifecycle as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Listening,
    Draining,
    Stopped,
    Failed,
}

/// Fatal shutdown outcomes. The process should exit non-zero on any of these.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("in-flight requests did not finish within {grace:?} ({in_flight} connections still open)")]
    DrainTimeout { grace: Duration, in_flight: u64 },
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[source] io::Error),
    #[error("shutdown coordinator exited without reporting an outcome")]
    CoordinatorLost,
}

/// Tells the accept loop, connections and background tasks to stop.
///
/// Dropping the coordinator without spawning it counts as draining.
#[derive(Debug, Clone)]
pub struct DrainSignal {
    rx: watch::Receiver<bool>,
}

impl DrainSignal {
    pub fn is_draining(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once draining has begun.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|draining| *draining).await;
    }
}

/// Owns the lifecycle phase and the drain trigger.
pub struct ShutdownCoordinator {
    drain_tx: watch::Sender<bool>,
    phase: watch::Sender<LifecyclePhase>,
    connections: ConnectionTracker,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator that allows `grace` for in-flight work at shutdown.
    pub fn new(grace: Duration) -> Self {
        let (drain_tx, _) = watch::channel(false);
        let (phase, _) = watch::channel(LifecyclePhase::Idle);
        Self {
            drain_tx,
            phase,
            connections: ConnectionTracker::new(),
            grace,
        }
    }

    pub fn drain_signal(&self) -> DrainSignal {
        DrainSignal {
            rx: self.drain_tx.subscribe(),
        }
    }

    /// Tracker that connection tasks register with.
    pub fn connections(&self) -> ConnectionTracker {
        self.connections.clone()
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.borrow()
    }

    /// Start the coordinator task. `trigger` resolves when shutdown is requested.
    pub fn spawn<F>(self, trigger: F) -> ShutdownHandle
    where
        F: Future<Output = io::Result<ShutdownSignal>> + Send + 'static,
    {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let phase = self.phase.subscribe();
        self.phase.send_replace(LifecyclePhase::Listening);

        tokio::spawn(async move {
            let outcome = self.run(trigger).await;
            let _ = outcome_tx.send(outcome);
        });

        ShutdownHandle {
            outcome: outcome_rx,
            phase,
        }
    }

    async fn run<F>(self, trigger: F) -> Result<(), ShutdownError>
    where
        F: Future<Output = io::Result<ShutdownSignal>>,
    {
        let signal = match trigger.await {
            Ok(signal) => signal,
            Err(e) => {
                tracing::error!(error = %e, "Signal listener failed, shutting down");
                self.drain_tx.send_replace(true);
                self.phase.send_replace(LifecyclePhase::Failed);
                return Err(ShutdownError::Signal(e));
            }
        };

        tracing::info!(
            signal = %signal,
            in_flight = self.connections.active_count(),
            grace_secs = self.grace.as_secs_f64(),
            "Shutting down the server"
        );
        self.phase.send_replace(LifecyclePhase::Draining);
        self.drain_tx.send_replace(true);

        match tokio::time::timeout(self.grace, self.connections.wait_idle()).await {
            Ok(()) => {
                self.phase.send_replace(LifecyclePhase::Stopped);
                tracing::info!("All connections drained");
                Ok(())
            }
            Err(_) => {
                let in_flight = self.connections.active_count();
                self.phase.send_replace(LifecyclePhase::Failed);
                tracing::error!(in_flight, "Drain timed out");
                Err(ShutdownError::DrainTimeout {
                    grace: self.grace,
                    in_flight,
                })
            }
        }
    }
}

/// The entry point's side of the coordinator.
pub struct ShutdownHandle {
    outcome: oneshot::Receiver<Result<(), ShutdownError>>,
    phase: watch::Receiver<LifecyclePhase>,
}

impl ShutdownHandle {
    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.borrow()
    }

    /// Wait for the final disposition. Call after the accept loop has returned.
    pub async fn outcome(self) -> Result<(), ShutdownError> {
        self.outcome.await.unwrap_or(Err(ShutdownError::CoordinatorLost))
    }
}
