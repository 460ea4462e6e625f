//! Lookup capabilities the autoscaler consumes.
//!
//! The engine never fetches anything itself: it asks a [`ClusterLister`]
//! for snapshots and a [`TargetProvider`] for raw replica targets.

use tidescale_state::{ClusterTopology, MemberType, ReplicaSet, StateResult, StateStore};

/// Resolves the objects a pass operates on. `None` means not found.
///
/// Store liveness comes from the cluster status in the returned topology,
/// so it is only as fresh as the last status write.
pub trait ClusterLister: Send + Sync {
    fn get_cluster(&self, namespace: &str, name: &str) -> StateResult<Option<ClusterTopology>>;

    fn get_replica_set(
        &self,
        namespace: &str,
        cluster: &str,
        member: MemberType,
    ) -> StateResult<Option<ReplicaSet>>;
}

impl ClusterLister for StateStore {
    fn get_cluster(&self, namespace: &str, name: &str) -> StateResult<Option<ClusterTopology>> {
        StateStore::get_cluster(self, &format!("{namespace}/{name}"))
    }

    fn get_replica_set(
        &self,
        namespace: &str,
        cluster: &str,
        member: MemberType,
    ) -> StateResult<Option<ReplicaSet>> {
        StateStore::get_replica_set(self, namespace, cluster, member)
    }
}

/// Source of the raw (unclamped) target replica count for a component.
pub trait TargetProvider: Send + Sync {
    /// `None` means there is no recommendation this pass.
    fn target_replicas(&self, cluster: &ClusterTopology, member: MemberType) -> Option<i32>;
}

/// Fixed per-component targets, e.g. from the daemon config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticTargets {
    pub sql: Option<i32>,
    pub storage: Option<i32>,
}

impl StaticTargets {
    pub fn new(sql: Option<i32>, storage: Option<i32>) -> Self {
        Self { sql, storage }
    }
}

impl TargetProvider for StaticTargets {
    fn target_replicas(&self, _cluster: &ClusterTopology, member: MemberType) -> Option<i32> {
        match member {
            MemberType::Sql => self.sql,
            MemberType::Storage => self.storage,
        }
    }
}
