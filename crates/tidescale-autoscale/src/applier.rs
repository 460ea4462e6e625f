//! Scale application: mutate the topology and record history together.

use std::collections::BTreeSet;

use tracing::debug;

use tidescale_state::{AutoScalingPolicy, ClusterTopology, MemberType};

use crate::error::{AutoScaleError, AutoScaleResult};
use crate::history::{HistoryKeys, encode_ordinals, pending_ordinals, pod_ordinals};

/// A replica change the interval gate has already admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleChange {
    pub member: MemberType,
    pub current: i32,
    pub recommended: i32,
}

/// Write `recommended` into the topology and stamp the policy history.
///
/// On a storage scale-out the slots that `recommended` adds over
/// `current` are unioned into the pending-ordinal annotation. That set
/// is only ever grown here; draining it belongs to whoever consumes it.
///
/// Everything fallible runs before the first write, so on error neither
/// the topology nor the annotations have changed.
pub fn apply_scale(
    topology: &mut ClusterTopology,
    policy: &mut AutoScalingPolicy,
    keys: &HistoryKeys,
    change: ScaleChange,
    delete_slots: &BTreeSet<i32>,
    now: u64,
) -> AutoScaleResult<()> {
    let ScaleChange {
        member,
        current,
        recommended,
    } = change;
    if topology.spec(member).is_none() {
        return Err(AutoScaleError::Config(format!(
            "cluster {} does not declare {member}",
            topology.cluster_ref()
        )));
    }

    let ordinals_annotation = match member {
        MemberType::Storage if recommended > current => {
            newly_created_ordinals(policy, keys, current, recommended, delete_slots)?
        }
        // No consumer for SQL-tier slots, so they are not tracked.
        _ => None,
    };

    policy
        .annotations
        .insert(keys.timestamp.clone(), now.to_string());
    if let Some(encoded) = ordinals_annotation {
        debug!(key = %keys.ordinals, ordinals = %encoded, "recorded scale-out ordinals");
        policy.annotations.insert(keys.ordinals.clone(), encoded);
    }
    if let Some(spec) = topology.spec_mut(member) {
        spec.replicas = recommended;
    }
    Ok(())
}

/// Encoded union of pending and newly created ordinals, or `None` when
/// the scale-out creates no new slot.
fn newly_created_ordinals(
    policy: &AutoScalingPolicy,
    keys: &HistoryKeys,
    current: i32,
    recommended: i32,
    delete_slots: &BTreeSet<i32>,
) -> AutoScaleResult<Option<String>> {
    let before = pod_ordinals(current, delete_slots);
    let after = pod_ordinals(recommended, delete_slots);
    let created: BTreeSet<i32> = after.difference(&before).copied().collect();
    if created.is_empty() {
        return Ok(None);
    }

    let mut pending = pending_ordinals(&policy.annotations, keys)?;
    pending.extend(created);
    encode_ordinals(&pending).map(Some)
}
