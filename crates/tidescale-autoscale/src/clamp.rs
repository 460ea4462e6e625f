//! Replica target clamping and bound validation.

use tidescale_state::ComponentPolicy;

use crate::error::{AutoScaleError, AutoScaleResult};

/// Bound a raw target into `[min_replicas, max_replicas]`.
///
/// Total for any input: when `min_replicas > max_replicas` the result is
/// `min_replicas`. The manager rejects such policies via
/// [`validate_bounds`] before ever clamping.
pub fn clamp_target_replicas(raw_target: i32, policy: &ComponentPolicy) -> i32 {
    let mut target = raw_target;
    if target > policy.max_replicas {
        target = policy.max_replicas;
    }
    if target < policy.min_replicas {
        target = policy.min_replicas;
    }
    target
}

/// Reject bounds the engine refuses to act on.
pub fn validate_bounds(policy: &ComponentPolicy) -> AutoScaleResult<()> {
    if policy.min_replicas < 0 {
        return Err(AutoScaleError::Config(format!(
            "min_replicas {} is negative",
            policy.min_replicas
        )));
    }
    if policy.min_replicas > policy.max_replicas {
        return Err(AutoScaleError::Config(format!(
            "min_replicas {} > max_replicas {}",
            policy.min_replicas, policy.max_replicas
        )));
    }
    Ok(())
}
