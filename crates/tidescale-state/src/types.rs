//! Domain types for the Tidescale state store.
//!
//! These are the snapshots a reconciliation pass works on: the autoscaling
//! policy with its history annotations, the cluster topology, and the
//! replica set backing each component. All types are serializable to/from
//! JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ── Component ─────────────────────────────────────────────────────

/// The two managed roles within a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    /// Stateless SQL tier.
    Sql,
    /// Storage tier; its live membership is tracked separately from its spec.
    Storage,
}

impl MemberType {
    /// Evaluation order within a pass.
    pub const ALL: [MemberType; 2] = [MemberType::Sql, MemberType::Storage];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Sql => "sql",
            MemberType::Storage => "storage",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Policy ────────────────────────────────────────────────────────

/// Reference to a cluster topology by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterRef {
    pub namespace: String,
    pub name: String,
}

impl ClusterRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Declarative autoscaling policy for one or more clusters.
///
/// A component without a config block is not managed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoScalingPolicy {
    pub namespace: String,
    pub name: String,
    /// Clusters this policy drives.
    pub clusters: Vec<ClusterRef>,
    #[serde(default)]
    pub sql: Option<ComponentPolicy>,
    #[serde(default)]
    pub storage: Option<ComponentPolicy>,
    /// Scaling history side-channel (timestamps, pending ordinals).
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl AutoScalingPolicy {
    /// Build the composite key for the policies table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// The policy block for a component, if that component is managed.
    pub fn component(&self, member: MemberType) -> Option<&ComponentPolicy> {
        match member {
            MemberType::Sql => self.sql.as_ref(),
            MemberType::Storage => self.storage.as_ref(),
        }
    }
}

/// Bounds and cool-downs for one component.
///
/// Interval fields are optional so an explicit `null` can be told apart
/// from an omitted field (which takes the default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPolicy {
    #[serde(default = "default_min_replicas")]
    pub min_replicas: i32,
    pub max_replicas: i32,
    #[serde(default = "default_scale_out_interval")]
    pub scale_out_interval_seconds: Option<i32>,
    #[serde(default = "default_scale_in_interval")]
    pub scale_in_interval_seconds: Option<i32>,
}

impl ComponentPolicy {
    pub fn new(min_replicas: i32, max_replicas: i32) -> Self {
        Self {
            min_replicas,
            max_replicas,
            scale_out_interval_seconds: default_scale_out_interval(),
            scale_in_interval_seconds: default_scale_in_interval(),
        }
    }

    pub fn with_intervals(mut self, scale_out_secs: i32, scale_in_secs: i32) -> Self {
        self.scale_out_interval_seconds = Some(scale_out_secs);
        self.scale_in_interval_seconds = Some(scale_in_secs);
        self
    }
}

fn default_min_replicas() -> i32 {
    1
}

fn default_scale_out_interval() -> Option<i32> {
    Some(300)
}

fn default_scale_in_interval() -> Option<i32> {
    Some(500)
}

// ── Cluster topology ──────────────────────────────────────────────

/// Desired and observed state of a managed database cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub sql: Option<ComponentSpec>,
    #[serde(default)]
    pub storage: Option<ComponentSpec>,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl ClusterTopology {
    /// Build the composite key for the clusters table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn cluster_ref(&self) -> ClusterRef {
        ClusterRef::new(&self.namespace, &self.name)
    }

    pub fn spec(&self, member: MemberType) -> Option<&ComponentSpec> {
        match member {
            MemberType::Sql => self.sql.as_ref(),
            MemberType::Storage => self.storage.as_ref(),
        }
    }

    pub fn spec_mut(&mut self, member: MemberType) -> Option<&mut ComponentSpec> {
        match member {
            MemberType::Sql => self.sql.as_mut(),
            MemberType::Storage => self.storage.as_mut(),
        }
    }

    pub fn status(&self, member: MemberType) -> &ComponentStatus {
        match member {
            MemberType::Sql => &self.status.sql,
            MemberType::Storage => &self.status.storage,
        }
    }
}

/// Desired state of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Declared replica count.
    pub replicas: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(default)]
    pub sql: ComponentStatus,
    #[serde(default)]
    pub storage: ComponentStatus,
}

/// Observed state of one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    #[serde(default)]
    pub phase: MemberPhase,
    /// Live members as reported by the placement driver. Storage tier only.
    #[serde(default)]
    pub members: Vec<StoreMember>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberPhase {
    #[default]
    Normal,
    Scaling,
    Upgrading,
}

/// One live storage instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMember {
    pub id: String,
    pub pod_name: String,
    pub state: StoreState,
}

/// Liveness of a storage instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    Up,
    Offline,
    Down,
    Tombstone,
}

// ── Replica set ───────────────────────────────────────────────────

/// The ordered replica set backing one component of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSet {
    pub namespace: String,
    pub cluster: String,
    pub member: MemberType,
    /// Desired replicas on the replica set itself.
    pub replicas: i32,
    /// Replicas the replica set controller currently reports.
    pub status_replicas: i32,
    pub generation: i64,
    pub observed_generation: i64,
    pub current_revision: String,
    pub update_revision: String,
    /// Ordinals skipped when assigning slots.
    #[serde(default)]
    pub delete_slots: BTreeSet<i32>,
}

impl ReplicaSet {
    /// Build the composite key for the replica sets table.
    pub fn table_key(&self) -> String {
        replica_set_key(&self.namespace, &self.cluster, self.member)
    }
}

/// Composite key for a replica set record.
pub fn replica_set_key(namespace: &str, cluster: &str, member: MemberType) -> String {
    format!("{namespace}/{cluster}:{member}")
}

// ── Scheduling plans ──────────────────────────────────────────────

/// A time-boxed plan to move hot regions onto specific stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub id: String,
    pub region_ids: Vec<u64>,
    pub store_ids: Vec<u64>,
    /// Unix seconds, inclusive.
    pub start_time: u64,
    /// Unix seconds, inclusive.
    pub end_time: u64,
}

impl SchedulePlan {
    /// Whether `now` falls within `[start_time, end_time]`.
    pub fn is_active(&self, now: u64) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}
