//! Shared fixtures for unit tests.

use std::collections::{BTreeMap, BTreeSet};

use tidescale_state::*;

pub const NS: &str = "db";
pub const CLUSTER: &str = "basic";

pub fn test_policy() -> AutoScalingPolicy {
    AutoScalingPolicy {
        namespace: NS.to_string(),
        name: "basic-autoscaler".to_string(),
        clusters: vec![ClusterRef::new(NS, CLUSTER)],
        sql: Some(ComponentPolicy::new(2, 10).with_intervals(60, 60)),
        storage: Some(ComponentPolicy::new(3, 10).with_intervals(300, 500)),
        annotations: BTreeMap::new(),
    }
}

/// A settled cluster whose storage members are all up.
pub fn test_topology(sql_replicas: i32, storage_replicas: i32) -> ClusterTopology {
    let mut topology = ClusterTopology {
        namespace: NS.to_string(),
        name: CLUSTER.to_string(),
        sql: Some(ComponentSpec {
            replicas: sql_replicas,
        }),
        storage: Some(ComponentSpec {
            replicas: storage_replicas,
        }),
        status: ClusterStatus::default(),
    };
    topology.status.storage.members = (0..storage_replicas)
        .map(|i| store_member(i, StoreState::Up))
        .collect();
    topology
}

pub fn store_member(ordinal: i32, state: StoreState) -> StoreMember {
    StoreMember {
        id: format!("{}", ordinal + 1),
        pod_name: format!("{CLUSTER}-storage-{ordinal}"),
        state,
    }
}

pub fn test_replica_set(member: MemberType, replicas: i32) -> ReplicaSet {
    ReplicaSet {
        namespace: NS.to_string(),
        cluster: CLUSTER.to_string(),
        member,
        replicas,
        status_replicas: replicas,
        generation: 1,
        observed_generation: 1,
        current_revision: "rev-1".to_string(),
        update_revision: "rev-1".to_string(),
        delete_slots: BTreeSet::new(),
    }
}
