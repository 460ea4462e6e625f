//! Whether a component is eligible for a decision at all.

use std::fmt;

use tidescale_state::{AutoScalingPolicy, ClusterTopology, MemberPhase, MemberType, ReplicaSet};

/// Result of the prerequisite check for one component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility<'a> {
    /// Safe to evaluate; carries the backing replica set.
    Eligible(&'a ReplicaSet),
    /// The policy or the cluster does not declare this component.
    Unmanaged,
    /// Exists and is managed, but cannot be evaluated yet.
    NotReady(NotReadyReason),
}

impl Eligibility<'_> {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyReason {
    /// The backing replica set has not been created yet.
    ReplicaSetMissing,
    /// The replica set controller has not observed the latest generation.
    GenerationPending,
    /// Pods are being moved to a new revision.
    RevisionRollout,
    /// The replica set has not converged on its desired replicas.
    ReplicasConverging,
    /// The cluster reports the component is not in the normal phase.
    PhaseNotNormal,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotReadyReason::ReplicaSetMissing => "replica set not created yet",
            NotReadyReason::GenerationPending => "replica set generation not observed",
            NotReadyReason::RevisionRollout => "revision rollout in progress",
            NotReadyReason::ReplicasConverging => "replica count converging",
            NotReadyReason::PhaseNotNormal => "component not in normal phase",
        };
        f.write_str(s)
    }
}

/// Decide whether `member` of `topology` may be scaled this pass.
///
/// Checks, in order: the backing replica set exists, the component is
/// managed by the policy and declared by the cluster, and nothing is
/// rolling out. No side effects.
pub fn check_prerequisites<'a>(
    topology: &ClusterTopology,
    replica_set: Option<&'a ReplicaSet>,
    policy: &AutoScalingPolicy,
    member: MemberType,
) -> Eligibility<'a> {
    let Some(set) = replica_set else {
        return Eligibility::NotReady(NotReadyReason::ReplicaSetMissing);
    };

    if policy.component(member).is_none() || topology.spec(member).is_none() {
        return Eligibility::Unmanaged;
    }

    if let Some(reason) = rollout_in_progress(set) {
        return Eligibility::NotReady(reason);
    }

    if topology.status(member).phase != MemberPhase::Normal {
        return Eligibility::NotReady(NotReadyReason::PhaseNotNormal);
    }

    Eligibility::Eligible(set)
}

fn rollout_in_progress(set: &ReplicaSet) -> Option<NotReadyReason> {
    if set.generation != set.observed_generation {
        Some(NotReadyReason::GenerationPending)
    } else if set.current_revision != set.update_revision {
        Some(NotReadyReason::RevisionRollout)
    } else if set.replicas != set.status_replicas {
        Some(NotReadyReason::ReplicasConverging)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn eligible_when_settled() {
        let topology = test_topology(2, 3);
        let set = test_replica_set(MemberType::Sql, 2);
        let policy = test_policy();

        let result = check_prerequisites(&topology, Some(&set), &policy, MemberType::Sql);
        assert_eq!(result, Eligibility::Eligible(&set));
        assert!(result.is_eligible());
    }

    #[test]
    fn missing_replica_set_is_not_ready() {
        let topology = test_topology(2, 3);
        let policy = test_policy();

        assert_eq!(
            check_prerequisites(&topology, None, &policy, MemberType::Sql),
            Eligibility::NotReady(NotReadyReason::ReplicaSetMissing)
        );
    }

    #[test]
    fn unmanaged_component() {
        let topology = test_topology(2, 3);
        let set = test_replica_set(MemberType::Storage, 3);
        let mut policy = test_policy();
        policy.storage = None;

        assert_eq!(
            check_prerequisites(&topology, Some(&set), &policy, MemberType::Storage),
            Eligibility::Unmanaged
        );
    }

    #[test]
    fn component_absent_from_cluster_is_unmanaged() {
        let mut topology = test_topology(2, 3);
        topology.sql = None;
        let set = test_replica_set(MemberType::Sql, 2);

        assert_eq!(
            check_prerequisites(&topology, Some(&set), &test_policy(), MemberType::Sql),
            Eligibility::Unmanaged
        );
    }

    #[test]
    fn rollout_blocks_evaluation() {
        let topology = test_topology(2, 3);
        let policy = test_policy();

        let mut set = test_replica_set(MemberType::Sql, 2);
        set.generation = 3;
        assert_eq!(
            check_prerequisites(&topology, Some(&set), &policy, MemberType::Sql),
            Eligibility::NotReady(NotReadyReason::GenerationPending)
        );

        let mut set = test_replica_set(MemberType::Sql, 2);
        set.update_revision = "rev-2".to_string();
        assert_eq!(
            check_prerequisites(&topology, Some(&set), &policy, MemberType::Sql),
            Eligibility::NotReady(NotReadyReason::RevisionRollout)
        );

        let mut set = test_replica_set(MemberType::Sql, 2);
        set.status_replicas = 1;
        assert_eq!(
            check_prerequisites(&topology, Some(&set), &policy, MemberType::Sql),
            Eligibility::NotReady(NotReadyReason::ReplicasConverging)
        );
    }

    #[test]
    fn non_normal_phase_blocks_evaluation() {
        let mut topology = test_topology(2, 3);
        topology.status.storage.phase = MemberPhase::Upgrading;
        let set = test_replica_set(MemberType::Storage, 3);

        assert_eq!(
            check_prerequisites(&topology, Some(&set), &test_policy(), MemberType::Storage),
            Eligibility::NotReady(NotReadyReason::PhaseNotNormal)
        );
    }
}
