//! Per-direction cool-down between scale events.
//!
//! One timestamp per component is recorded regardless of direction; the
//! bound applied at read time depends on the direction being attempted.

use std::fmt;

use tidescale_state::{AutoScalingPolicy, ComponentPolicy, MemberType};

use crate::error::{AutoScaleError, AutoScaleResult};
use crate::history::{HistoryKeys, last_scale_timestamp};

/// Direction of a proposed change relative to the current replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    Out,
    In,
    None,
}

impl ScaleDirection {
    pub fn between(current: i32, recommended: i32) -> Self {
        if recommended > current {
            ScaleDirection::Out
        } else if recommended < current {
            ScaleDirection::In
        } else {
            ScaleDirection::None
        }
    }
}

impl fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleDirection::Out => "out",
            ScaleDirection::In => "in",
            ScaleDirection::None => "none",
        })
    }
}

/// The cool-down, in seconds, for `direction`.
///
/// Anything that is not a scale-out uses the scale-in interval.
pub fn interval_for(policy: &ComponentPolicy, direction: ScaleDirection) -> AutoScaleResult<u64> {
    let (field, value) = match direction {
        ScaleDirection::Out => ("scale_out_interval_seconds", policy.scale_out_interval_seconds),
        ScaleDirection::In | ScaleDirection::None => {
            ("scale_in_interval_seconds", policy.scale_in_interval_seconds)
        }
    };
    match value {
        None => Err(AutoScaleError::Config(format!("{field} is not set"))),
        Some(secs) if secs < 0 => Err(AutoScaleError::Config(format!(
            "{field} {secs} is negative"
        ))),
        Some(secs) => Ok(secs as u64),
    }
}

/// Whether enough time has passed since the last scale of `member`.
///
/// The first scale is always allowed. Errors only on malformed interval
/// config or a corrupt timestamp annotation.
pub fn can_scale(
    policy: &AutoScalingPolicy,
    keys: &HistoryKeys,
    member: MemberType,
    direction: ScaleDirection,
    now: u64,
) -> AutoScaleResult<bool> {
    let component = policy
        .component(member)
        .ok_or_else(|| AutoScaleError::Config(format!("{member} is not managed by the policy")))?;

    let Some(last) = last_scale_timestamp(&policy.annotations, keys)? else {
        return Ok(true);
    };

    let interval = interval_for(component, direction)?;
    let elapsed = now.saturating_sub(last);
    Ok(elapsed >= interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    const NOW: u64 = 1_700_000_000;

    fn policy_with_last_scale(member: MemberType, secs_ago: u64) -> AutoScalingPolicy {
        let mut policy = test_policy();
        policy.storage = Some(ComponentPolicy::new(3, 10).with_intervals(300, 500));
        let keys = HistoryKeys::new(member, None);
        policy
            .annotations
            .insert(keys.timestamp, (NOW - secs_ago).to_string());
        policy
    }

    #[test]
    fn direction_between() {
        assert_eq!(ScaleDirection::between(3, 5), ScaleDirection::Out);
        assert_eq!(ScaleDirection::between(5, 3), ScaleDirection::In);
        assert_eq!(ScaleDirection::between(4, 4), ScaleDirection::None);
    }

    #[test]
    fn scale_out_blocked_inside_interval() {
        let keys = HistoryKeys::new(MemberType::Storage, None);
        let policy = policy_with_last_scale(MemberType::Storage, 100);
        assert!(!can_scale(&policy, &keys, MemberType::Storage, ScaleDirection::Out, NOW).unwrap());
    }

    #[test]
    fn scale_out_allowed_after_interval() {
        let keys = HistoryKeys::new(MemberType::Storage, None);
        let policy = policy_with_last_scale(MemberType::Storage, 301);
        assert!(can_scale(&policy, &keys, MemberType::Storage, ScaleDirection::Out, NOW).unwrap());

        let policy = policy_with_last_scale(MemberType::Storage, 300);
        assert!(can_scale(&policy, &keys, MemberType::Storage, ScaleDirection::Out, NOW).unwrap());
    }

    #[test]
    fn scale_in_uses_its_own_interval() {
        let keys = HistoryKeys::new(MemberType::Storage, None);
        let policy = policy_with_last_scale(MemberType::Storage, 400);
        assert!(can_scale(&policy, &keys, MemberType::Storage, ScaleDirection::Out, NOW).unwrap());
        assert!(!can_scale(&policy, &keys, MemberType::Storage, ScaleDirection::In, NOW).unwrap());
    }

    #[test]
    fn first_scale_always_allowed() {
        let keys = HistoryKeys::new(MemberType::Sql, None);
        let mut policy = test_policy();
        policy.sql = Some(ComponentPolicy {
            min_replicas: 1,
            max_replicas: 5,
            scale_out_interval_seconds: None,
            scale_in_interval_seconds: Some(-1),
        });

        assert!(can_scale(&policy, &keys, MemberType::Sql, ScaleDirection::Out, NOW).unwrap());
        assert!(can_scale(&policy, &keys, MemberType::Sql, ScaleDirection::In, NOW).unwrap());
    }

    #[test]
    fn missing_interval_is_config_error() {
        let keys = HistoryKeys::new(MemberType::Sql, None);
        let mut policy = policy_with_last_scale(MemberType::Sql, 10);
        if let Some(sql) = policy.sql.as_mut() {
            sql.scale_out_interval_seconds = None;
        }

        assert!(matches!(
            can_scale(&policy, &keys, MemberType::Sql, ScaleDirection::Out, NOW),
            Err(AutoScaleError::Config(_))
        ));
    }

    #[test]
    fn clock_skew_counts_as_no_time_elapsed() {
        let keys = HistoryKeys::new(MemberType::Sql, None);
        let mut policy = test_policy();
        policy
            .annotations
            .insert(keys.timestamp.clone(), (NOW + 50).to_string());

        assert!(!can_scale(&policy, &keys, MemberType::Sql, ScaleDirection::Out, NOW).unwrap());
    }
}
