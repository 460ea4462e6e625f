//! Object bundles loaded with `tidescaled apply`.
//!
//! ```json
//! {
//!   "policies":       [ { "namespace": "db", "name": "basic-autoscaler", ... } ],
//!   "clusters":       [ { "namespace": "db", "name": "basic", ... } ],
//!   "replica_sets":   [ { "namespace": "db", "cluster": "basic", "member": "sql", ... } ],
//!   "schedule_plans": [ { "id": "p1", "region_ids": [7], ... } ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use tidescale_state::{
    AutoScalingPolicy, ClusterTopology, ReplicaSet, SchedulePlan, StateResult, StateStore,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectBundle {
    pub policies: Vec<AutoScalingPolicy>,
    pub clusters: Vec<ClusterTopology>,
    pub replica_sets: Vec<ReplicaSet>,
    pub schedule_plans: Vec<SchedulePlan>,
}

/// Counts of records written by [`ObjectBundle::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub policies: usize,
    pub clusters: usize,
    pub replica_sets: usize,
    pub schedule_plans: usize,
}

impl ObjectBundle {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Upsert every object into the store.
    pub fn apply(&self, store: &StateStore) -> StateResult<ApplySummary> {
        for policy in &self.policies {
            store.put_policy(policy)?;
        }
        for cluster in &self.clusters {
            store.put_cluster(cluster)?;
        }
        for set in &self.replica_sets {
            store.put_replica_set(set)?;
        }
        for plan in &self.schedule_plans {
            store.put_schedule_plan(plan)?;
        }

        let summary = ApplySummary {
            policies: self.policies.len(),
            clusters: self.clusters.len(),
            replica_sets: self.replica_sets.len(),
            schedule_plans: self.schedule_plans.len(),
        };
        info!(
            policies = summary.policies,
            clusters = summary.clusters,
            replica_sets = summary.replica_sets,
            schedule_plans = summary.schedule_plans,
            "objects applied"
        );
        Ok(summary)
    }
}
