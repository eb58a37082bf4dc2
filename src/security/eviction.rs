//! Background eviction of idle rate-limit clients.
//!
//! Keeps the client table from growing without bound. Shares the table's
//! mutex with the admission gate, so a sweep never sees a half-updated entry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::lifecycle::shutdown::DrainSignal;
use crate::observability::metrics;
use crate::security::rate_limit::ClientTable;

pub struct EvictionSweeper {
    clients: Arc<ClientTable>,
    interval: Duration,
    max_idle: Duration,
}

impl EvictionSweeper {
    pub fn new(clients: Arc<ClientTable>, interval: Duration, max_idle: Duration) -> Self {
        Self {
            clients,
            interval,
            max_idle,
        }
    }

    /// Sweep every `interval` until the server starts draining.
    pub async fn run(self, mut drain: DrainSignal) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_idle_secs = self.max_idle.as_secs(),
            "Client eviction sweeper starting"
        );

        // First sweep one full period after start.
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = drain.wait() => {
                    tracing::debug!("Eviction sweeper stopping");
                    break;
                }
            }
        }
    }

    /// Run a single sweep. Returns the number of evicted clients.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.clients.sweep(self.max_idle);
        let remaining = self.clients.len();

        if evicted > 0 {
            tracing::debug!(evicted, remaining, "Evicted idle clients");
        }
        metrics::record_evicted_clients(evicted);
        metrics::record_tracked_clients(remaining);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ShutdownCoordinator, ShutdownSignal};
    use std::net::IpAddr;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn idle_client_is_gone_after_next_sweep() {
        let clients = Arc::new(ClientTable::new(2.0, 4));
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let sweeper = EvictionSweeper::new(
            clients.clone(),
            Duration::from_secs(60),
            Duration::from_secs(180),
        );
        let task = tokio::spawn(sweeper.run(coordinator.drain_signal()));

        clients.check(ip("10.0.0.1"));

        // Sweeps at 60s, 120s and 180s find the client still fresh enough.
        time::sleep(Duration::from_secs(181)).await;
        assert!(clients.contains(ip("10.0.0.1")));

        // The 240s sweep sees 240s of inactivity.
        time::sleep(Duration::from_secs(60)).await;
        assert!(!clients.contains(ip("10.0.0.1")));

        drop(coordinator);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn active_clients_survive_sweeps() {
        let clients = Arc::new(ClientTable::new(100.0, 100));
        let sweeper = EvictionSweeper::new(
            clients.clone(),
            Duration::from_secs(60),
            Duration::from_secs(180),
        );

        for _ in 0..10 {
            clients.check(ip("10.0.0.9"));
            time::advance(Duration::from_secs(60)).await;
            assert_eq!(sweeper.sweep_once(), 0);
        }
        assert!(clients.contains(ip("10.0.0.9")));
    }

    #[tokio::test]
    async fn stops_when_draining() {
        let clients = Arc::new(ClientTable::new(2.0, 4));
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let sweeper = EvictionSweeper::new(clients, Duration::from_secs(60), Duration::from_secs(180));
        let task = tokio::spawn(sweeper.run(coordinator.drain_signal()));

        let handle = coordinator.spawn(async { Ok::<_, std::io::Error>(ShutdownSignal::Interrupt) });
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper should stop on drain")
            .unwrap();
        handle.outcome().await.unwrap();
    }
}
