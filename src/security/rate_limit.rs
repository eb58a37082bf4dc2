//! Per-client token-bucket rate limiting.
//!
//! One table entry per client IP, all behind a single mutex. Admission
//! (lookup, create, refill, deduct, touch) happens inside one critical
//! section so concurrent requests from the same client never observe a
//! stale token count. The eviction sweeper takes the same lock.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

/// A simple token bucket rate limiter.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// A bucket that starts full.
    pub fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    /// Refill by elapsed time, then take one token if available.
    pub fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently in the bucket, as of the last refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

/// Rate-limit state for one client.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    pub limiter: TokenBucket,
    pub last_seen: Instant,
}

/// Copy of a client entry handed out of the table.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub identity: IpAddr,
    pub tokens: f64,
    pub last_seen: Instant,
}

/// Shared table of per-client limiter state.
#[derive(Debug)]
pub struct ClientTable {
    clients: Mutex<HashMap<IpAddr, ClientEntry>>,
    refill_rate: f64,
    capacity: f64,
}

impl ClientTable {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            refill_rate: requests_per_second,
            capacity: burst as f64,
        }
    }

    // A panic elsewhere cannot leave an entry half-written, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, ClientEntry>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry_at<'a>(
        &self,
        clients: &'a mut HashMap<IpAddr, ClientEntry>,
        identity: IpAddr,
        now: Instant,
    ) -> &'a mut ClientEntry {
        let capacity = self.capacity;
        clients.entry(identity).or_insert_with(|| {
            tracing::debug!(client = %identity, "Tracking new client");
            ClientEntry {
                limiter: TokenBucket::new(capacity, now),
                last_seen: now,
            }
        })
    }

    /// Admit or reject one request from `identity`.
    ///
    /// Creates the entry on first sight. `last_seen` is refreshed only when
    /// the request is admitted.
    pub fn check(&self, identity: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.lock();
        let entry = self.entry_at(&mut clients, identity, now);

        let allowed = entry.limiter.try_acquire(now, self.capacity, self.refill_rate);
        if allowed {
            entry.last_seen = now;
        }
        allowed
    }

    /// Look up `identity`, inserting a fresh entry when absent.
    pub fn get_or_create(&self, identity: IpAddr) -> ClientSnapshot {
        let now = Instant::now();
        let mut clients = self.lock();
        let entry = self.entry_at(&mut clients, identity, now);
        ClientSnapshot {
            identity,
            tokens: entry.limiter.tokens(),
            last_seen: entry.last_seen,
        }
    }

    /// Refresh `last_seen`. Returns false when the client is not tracked.
    pub fn touch(&self, identity: IpAddr) -> bool {
        let now = Instant::now();
        match self.lock().get_mut(&identity) {
            Some(entry) => {
                entry.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Drop every client idle for longer than `max_idle`. Returns how many were removed.
    pub fn sweep(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= max_idle);
        before - clients.len()
    }

    pub fn contains(&self, identity: IpAddr) -> bool {
        self.lock().contains_key(&identity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
