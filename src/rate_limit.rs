use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

use crate::identity::ClientIdentity;
use crate::metrics::RATE_LIMIT_TRACKED;

// One admission per identity per cooldown.
// Cheap to clone, clones share the same map.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    cooldown: Duration,
    last_admitted: DashMap<ClientIdentity, Instant>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                cooldown,
                last_admitted: DashMap::new(),
            }),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.inner.cooldown
    }

    /// Admits `identity` if it has no record or its last admission is at
    /// least one cooldown old, and records `now` on success.
    ///
    /// The check and the update happen under the shard lock of the entry, so
    /// two concurrent calls for one identity can't both be admitted.
    /// A rejection leaves the record untouched.
    pub fn admit(&self, identity: &ClientIdentity, now: Instant) -> bool {
        match self.inner.last_admitted.entry(identity.clone()) {
            Entry::Occupied(mut slot) => {
                if now.saturating_duration_since(*slot.get()) < self.inner.cooldown {
                    return false;
                }
                slot.insert(now);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    // Drops records whose cooldown has run out. A missing record admits just
    // like an expired one, so this never changes an admit decision.
    pub fn sweep(&self, now: Instant) -> usize {
        let cooldown = self.inner.cooldown;
        let before = self.inner.last_admitted.len();
        self.inner
            .last_admitted
            .retain(|_, last| now.saturating_duration_since(*last) < cooldown);
        before.saturating_sub(self.inner.last_admitted.len())
    }

    pub fn len(&self) -> usize {
        self.inner.last_admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.last_admitted.is_empty()
    }
}

// Background eviction loop, runs for the life of the process
pub async fn run_sweeper(limiter: RateLimiter, every: Duration) {
    let mut interval = interval(every);

    info!(interval = ?every, "rate limit sweeper started");

    loop {
        interval.tick().await;

        let evicted = limiter.sweep(Instant::now());
        if evicted > 0 {
            debug!(evicted, remaining = limiter.len(), "evicted expired rate limit records");
        }
        RATE_LIMIT_TRACKED.set(limiter.len() as f64);
    }
}
