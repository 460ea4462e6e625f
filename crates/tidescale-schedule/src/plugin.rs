//! Scheduler plugins resolved by name from the registry.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::ScheduleResult;
use crate::plan::SchedulePlanTable;

/// A pluggable scheduler driven on an adaptive interval.
pub trait SchedulerPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called before each scheduling round.
    fn prepare(&self) -> ScheduleResult<()> {
        Ok(())
    }

    /// Called when the scheduler is removed.
    fn cleanup(&self) {}

    fn min_interval(&self) -> Duration;

    /// Interval to wait after a round that waited `prev`.
    fn next_interval(&self, prev: Duration) -> Duration;
}

/// Base scheduler for user-supplied plans. Owns the plan table other
/// schedulers consult for predicted hot regions.
pub struct UserBaseScheduler {
    plans: Arc<dyn SchedulePlanTable>,
}

impl UserBaseScheduler {
    pub const NAME: &'static str = "user-base";
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);
    pub const MAX_INTERVAL: Duration = Duration::from_secs(5);
    pub const INTERVAL_FACTOR: f64 = 1.3;

    pub fn new(plans: Arc<dyn SchedulePlanTable>) -> Self {
        Self { plans }
    }

    pub fn plans(&self) -> &Arc<dyn SchedulePlanTable> {
        &self.plans
    }
}

impl SchedulerPlugin for UserBaseScheduler {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// Drops plans whose window has already closed.
    fn prepare(&self) -> ScheduleResult<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let pruned = self.plans.prune_expired(now)?;
        if pruned > 0 {
            debug!(pruned, "expired schedule plans removed");
        }
        Ok(())
    }

    fn min_interval(&self) -> Duration {
        Self::MIN_INTERVAL
    }

    fn next_interval(&self, prev: Duration) -> Duration {
        prev.mul_f64(Self::INTERVAL_FACTOR).min(Self::MAX_INTERVAL)
    }
}
