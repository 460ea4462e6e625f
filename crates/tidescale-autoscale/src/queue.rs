//! Rate-limited work queue of policy keys.
//!
//! Keys are de-duplicated while queued. Failed keys come back after an
//! exponential per-key backoff; `forget` resets it after a success.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Initial requeue delay.
pub const BASE_DELAY: Duration = Duration::from_millis(5);

pub struct RateLimitedQueue {
    ready: VecDeque<String>,
    /// Keys waiting out a backoff, with the instant they become ready.
    delayed: HashMap<String, Instant>,
    queued: HashSet<String>,
    failures: HashMap<String, u32>,
    max_delay: Duration,
}

impl RateLimitedQueue {
    pub fn new(max_delay: Duration) -> Self {
        Self {
            ready: VecDeque::new(),
            delayed: HashMap::new(),
            queued: HashSet::new(),
            failures: HashMap::new(),
            max_delay,
        }
    }

    /// Enqueue a key for immediate processing.
    pub fn add(&mut self, key: &str) {
        if self.delayed.remove(key).is_some() {
            self.ready.push_back(key.to_string());
            return;
        }
        if self.queued.insert(key.to_string()) {
            self.ready.push_back(key.to_string());
        }
    }

    /// Enqueue a key after its backoff; returns the delay applied.
    pub fn add_rate_limited(&mut self, key: &str, now: Instant) -> Duration {
        let failures = self.failures.entry(key.to_string()).or_insert(0);
        let delay = backoff(*failures, self.max_delay);
        *failures = failures.saturating_add(1);

        if self.queued.insert(key.to_string()) {
            self.delayed.insert(key.to_string(), now + delay);
        }
        delay
    }

    /// Clear the backoff history of a key.
    pub fn forget(&mut self, key: &str) {
        self.failures.remove(key);
    }

    /// How many times `key` has been requeued since it was last forgotten.
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    /// Pop the next key that is ready as of `now`.
    pub fn pop(&mut self, now: Instant) -> Option<String> {
        self.promote_due(now);
        let key = self.ready.pop_front()?;
        self.queued.remove(&key);
        Some(key)
    }

    /// When the earliest delayed key becomes ready.
    pub fn next_ready_at(&self) -> Option<Instant> {
        self.delayed.values().min().copied()
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    fn promote_due(&mut self, now: Instant) {
        let mut due: Vec<(String, Instant)> = self
            .delayed
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(k, at)| (k.clone(), *at))
            .collect();
        due.sort_by_key(|(_, at)| *at);
        for (key, _) in due {
            self.delayed.remove(&key);
            self.ready.push_back(key);
        }
    }
}

/// `BASE_DELAY * 2^failures`, capped at `max`.
fn backoff(failures: u32, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
    BASE_DELAY
        .checked_mul(factor)
        .map_or(max, |d| d.min(max))
}
