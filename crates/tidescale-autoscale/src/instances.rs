//! The replica baseline a decision is measured against.

use tidescale_state::{ClusterTopology, MemberType, StoreMember, StoreState};

/// The component's true current replica count.
///
/// The SQL tier trusts its declared replicas. The storage tier counts
/// members that are `Up`: removed stores linger as `Offline` or
/// `Tombstone` and would otherwise inflate the baseline.
pub fn current_replicas(topology: &ClusterTopology, member: MemberType) -> i32 {
    match member {
        MemberType::Sql => topology.sql.as_ref().map_or(0, |spec| spec.replicas),
        MemberType::Storage => up_members(topology).count() as i32,
    }
}

fn up_members(topology: &ClusterTopology) -> impl Iterator<Item = &StoreMember> {
    topology
        .status
        .storage
        .members
        .iter()
        .filter(|m| m.state == StoreState::Up)
}
