//! Autoscaling controller — drives reconciliation passes from a work queue.
//!
//! ```text
//!   resync tick ──► enqueue every policy key
//!                          │
//!                          ▼
//!   pop ready key ─► load policy ─► reconcile ─► commit ─► forget
//!                                      │
//!                        error/deferred └─► requeue with backoff
//! ```

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info};

use tidescale_state::StateStore;

use crate::error::{AutoScaleError, AutoScaleResult};
use crate::manager::{AutoScalerControl, SyncReport};
use crate::queue::RateLimitedQueue;

pub struct Controller<C> {
    store: StateStore,
    control: C,
    queue: RateLimitedQueue,
    resync_interval: Duration,
}

impl<C: AutoScalerControl> Controller<C> {
    pub fn new(
        store: StateStore,
        control: C,
        resync_interval: Duration,
        max_retry_backoff: Duration,
    ) -> Self {
        Self {
            store,
            control,
            queue: RateLimitedQueue::new(max_retry_backoff),
            resync_interval,
        }
    }

    pub fn queue(&self) -> &RateLimitedQueue {
        &self.queue
    }

    pub fn enqueue(&mut self, key: &str) {
        self.queue.add(key);
    }

    /// Enqueue every stored policy; returns how many were queued.
    pub fn enqueue_all(&mut self) -> AutoScaleResult<usize> {
        let policies = self.store.list_policies()?;
        for policy in &policies {
            self.queue.add(&policy.table_key());
        }
        Ok(policies.len())
    }

    /// Reconcile the policy stored under `key` and persist the result.
    ///
    /// A deleted policy is not an error. Components that were not ready
    /// turn into a [`AutoScaleError::Requeue`] once everything else has
    /// been committed.
    pub fn sync_key(&self, key: &str) -> AutoScaleResult<()> {
        let Some(mut report) = self.reconcile_key(key)? else {
            return Ok(());
        };
        report.result()?;

        let deferred = report.deferred();
        if !deferred.is_empty() {
            return Err(AutoScaleError::Requeue(deferred.join("; ")));
        }
        Ok(())
    }

    /// Run and commit one pass, returning the raw report.
    ///
    /// `Ok(None)` when the policy no longer exists. Per-component errors
    /// stay inside the report; only store failures are returned here.
    pub fn reconcile_key(&self, key: &str) -> AutoScaleResult<Option<SyncReport>> {
        let Some(mut policy) = self.store.get_policy(key)? else {
            info!(policy = %key, "autoscaling policy has been deleted");
            return Ok(None);
        };

        let report = self.control.reconcile_auto_scaler(&mut policy);
        if report.changed() {
            self.store
                .commit_pass(&policy, &report.changed_clusters())?;
        }
        Ok(Some(report))
    }

    /// Process one ready key, if any, and requeue it on failure.
    pub fn process_next(&mut self, now: Instant) -> Option<(String, AutoScaleResult<()>)> {
        let key = self.queue.pop(now)?;
        let result = self.sync_key(&key);

        match &result {
            Ok(()) => {
                self.queue.forget(&key);
                debug!(policy = %key, "autoscaling policy synced");
            }
            Err(e) => {
                let retry_ms = self.queue.add_rate_limited(&key, now).as_millis() as u64;
                if e.is_transient() {
                    info!(policy = %key, retry_ms, reason = %e, "autoscaling requeued");
                } else {
                    error!(policy = %key, retry_ms, error = %e, "autoscaling sync failed");
                }
            }
        }
        Some((key, result))
    }

    /// Process every key that is ready right now.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        while self.process_next(Instant::now()).is_some() {
            processed += 1;
        }
        processed
    }

    /// Run the controller loop until `shutdown` fires.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            resync_secs = self.resync_interval.as_secs(),
            "autoscaling controller started"
        );
        let mut resync = tokio::time::interval(self.resync_interval);

        loop {
            self.drain();
            let retry_at = self.queue.next_ready_at();

            tokio::select! {
                _ = resync.tick() => {
                    if let Err(e) = self.enqueue_all() {
                        error!(error = %e, "failed to list autoscaling policies");
                    }
                }
                _ = sleep_until(retry_at) => {}
                _ = shutdown.changed() => {
                    info!("autoscaling controller shutting down");
                    break;
                }
            }
        }
    }
}

/// Sleep until `at`, or forever when nothing is waiting.
async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
