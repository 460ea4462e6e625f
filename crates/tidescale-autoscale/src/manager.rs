//! AutoScaler manager — runs the decision pipeline for every cluster a
//! policy references.
//!
//! ```text
//! per cluster, per component:
//!   prerequisites ─► current replicas ─► clamp ─► interval gate ─► apply
//!        │                                 │            │
//!     Stable/Deferred                   Stable       Blocked       Applied
//! ```
//!
//! Each stage may end the pipeline early without error. Errors from one
//! component never stop its sibling, and errors from one cluster never
//! stop the next; they are aggregated into the pass report.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

use tidescale_state::{AutoScalingPolicy, ClusterRef, ClusterTopology, MemberType, ReplicaSet};

use crate::applier::{ScaleChange, apply_scale};
use crate::clamp::{clamp_target_replicas, validate_bounds};
use crate::error::{AutoScaleError, AutoScaleResult};
use crate::history::HistoryKeys;
use crate::instances::current_replicas;
use crate::interval::{ScaleDirection, can_scale};
use crate::lister::{ClusterLister, TargetProvider};
use crate::prerequisite::{Eligibility, NotReadyReason, check_prerequisites};

/// Trace of one component in one pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScaleOutcome {
    /// Nothing to change (unmanaged, no target, or already at target).
    Stable,
    /// Not evaluated because the component is not ready yet.
    Deferred { reason: NotReadyReason },
    /// A change was wanted but the cool-down has not elapsed.
    Blocked {
        current: i32,
        recommended: i32,
        direction: ScaleDirection,
    },
    /// The topology and history were updated.
    Applied {
        from: i32,
        to: i32,
        direction: ScaleDirection,
    },
}

/// Result of evaluating one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSync {
    /// The (possibly mutated) topology, for the caller to persist.
    pub topology: ClusterTopology,
    pub outcomes: Vec<(MemberType, ScaleOutcome)>,
}

impl ClusterSync {
    /// Whether any component was applied.
    pub fn changed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| matches!(o, ScaleOutcome::Applied { .. }))
    }
}

/// Everything one `sync` pass produced.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub clusters: Vec<ClusterSync>,
    pub errors: Vec<AutoScaleError>,
}

impl SyncReport {
    /// Whether any cluster topology (and so the policy history) was mutated.
    pub fn changed(&self) -> bool {
        self.clusters.iter().any(ClusterSync::changed)
    }

    /// Topologies that must be written back.
    pub fn changed_clusters(&self) -> Vec<ClusterTopology> {
        self.clusters
            .iter()
            .filter(|c| c.changed())
            .map(|c| c.topology.clone())
            .collect()
    }

    /// Components skipped because they were not ready, as `cluster [member]: reason`.
    pub fn deferred(&self) -> Vec<String> {
        self.clusters
            .iter()
            .flat_map(|c| {
                c.outcomes.iter().filter_map(move |(member, outcome)| match outcome {
                    ScaleOutcome::Deferred { reason } => {
                        Some(format!("{} [{member}]: {reason}", c.topology.cluster_ref()))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    /// Aggregate the collected errors.
    pub fn result(&mut self) -> AutoScaleResult<()> {
        AutoScaleError::aggregate(std::mem::take(&mut self.errors))
    }
}

/// Capability the controller drives; one production implementation.
pub trait AutoScalerControl: Send + Sync {
    /// Run one pass over `policy`, mutating its history annotations.
    fn reconcile_auto_scaler(&self, policy: &mut AutoScalingPolicy) -> SyncReport;
}

/// Clock returning unix seconds.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// The production [`AutoScalerControl`].
pub struct AutoScalerManager<L, T> {
    lister: L,
    targets: T,
    clock: Clock,
}

impl<L: ClusterLister, T: TargetProvider> AutoScalerManager<L, T> {
    pub fn new(lister: L, targets: T) -> Self {
        Self {
            lister,
            targets,
            clock: Arc::new(epoch_secs),
        }
    }

    /// Replace the wall clock (tests, simulations).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one pass at the current time.
    pub fn sync(&self, policy: &mut AutoScalingPolicy) -> SyncReport {
        let now = (self.clock)();
        self.sync_at(policy, now)
    }

    /// Run one pass as of `now` (unix seconds).
    pub fn sync_at(&self, policy: &mut AutoScalingPolicy, now: u64) -> SyncReport {
        let mut report = SyncReport::default();
        let scoped = policy.clusters.len() > 1;

        for cluster_ref in policy.clusters.clone() {
            let scope = scoped.then_some(&cluster_ref);
            match self.sync_cluster(policy, &cluster_ref, scope, now) {
                Ok(Some((cluster, errs))) => {
                    report.clusters.push(cluster);
                    report.errors.extend(errs);
                }
                Ok(None) => {}
                Err(e) => report.errors.push(e.in_cluster(&cluster_ref.to_string(), None)),
            }
        }

        debug!(
            policy = %policy.table_key(),
            clusters = report.clusters.len(),
            errors = report.errors.len(),
            "autoscaling pass finished"
        );
        report
    }

    /// `Ok(None)` when the cluster no longer exists.
    fn sync_cluster(
        &self,
        policy: &mut AutoScalingPolicy,
        cluster_ref: &ClusterRef,
        scope: Option<&ClusterRef>,
        now: u64,
    ) -> AutoScaleResult<Option<(ClusterSync, Vec<AutoScaleError>)>> {
        let Some(mut topology) = self
            .lister
            .get_cluster(&cluster_ref.namespace, &cluster_ref.name)?
        else {
            info!(cluster = %cluster_ref, "cluster not found, skipping");
            return Ok(None);
        };

        let mut outcomes = Vec::new();
        let mut errs = Vec::new();
        for member in MemberType::ALL {
            let result = self.sync_member(policy, &mut topology, member, scope, now);
            match result {
                Ok(outcome) => outcomes.push((member, outcome)),
                Err(e) => {
                    warn!(
                        cluster = %cluster_ref,
                        component = %member,
                        error = %e,
                        "autoscaling failed"
                    );
                    errs.push(e.in_cluster(&cluster_ref.to_string(), Some(member)));
                }
            }
        }

        Ok(Some((ClusterSync { topology, outcomes }, errs)))
    }

    fn sync_member(
        &self,
        policy: &mut AutoScalingPolicy,
        topology: &mut ClusterTopology,
        member: MemberType,
        scope: Option<&ClusterRef>,
        now: u64,
    ) -> AutoScaleResult<ScaleOutcome> {
        // Unmanaged components need no lookups at all.
        if policy.component(member).is_none() || topology.spec(member).is_none() {
            return Ok(ScaleOutcome::Stable);
        }
        let replica_set =
            self.lister
                .get_replica_set(&topology.namespace, &topology.name, member)?;
        let raw_target = self.targets.target_replicas(topology, member);
        let keys = HistoryKeys::new(member, scope);
        sync_component(
            topology,
            replica_set.as_ref(),
            policy,
            &keys,
            member,
            raw_target,
            now,
        )
    }
}

impl<L: ClusterLister, T: TargetProvider> AutoScalerControl for AutoScalerManager<L, T> {
    fn reconcile_auto_scaler(&self, policy: &mut AutoScalingPolicy) -> SyncReport {
        self.sync(policy)
    }
}

/// Run the full pipeline for one component.
pub fn sync_component(
    topology: &mut ClusterTopology,
    replica_set: Option<&ReplicaSet>,
    policy: &mut AutoScalingPolicy,
    keys: &HistoryKeys,
    member: MemberType,
    raw_target: Option<i32>,
    now: u64,
) -> AutoScaleResult<ScaleOutcome> {
    let set = match check_prerequisites(topology, replica_set, policy, member) {
        Eligibility::Eligible(set) => set,
        Eligibility::Unmanaged => return Ok(ScaleOutcome::Stable),
        Eligibility::NotReady(reason) => {
            debug!(
                cluster = %topology.cluster_ref(),
                component = %member,
                %reason,
                "not ready for autoscaling"
            );
            return Ok(ScaleOutcome::Deferred { reason });
        }
    };

    let Some(component) = policy.component(member).cloned() else {
        return Ok(ScaleOutcome::Stable);
    };
    validate_bounds(&component)?;

    let Some(raw_target) = raw_target else {
        return Ok(ScaleOutcome::Stable);
    };

    let current = current_replicas(topology, member);
    let declared = topology.spec(member).map_or(current, |spec| spec.replicas);
    let recommended = clamp_target_replicas(raw_target, &component);
    if recommended == current || recommended == declared {
        return Ok(ScaleOutcome::Stable);
    }

    let direction = ScaleDirection::between(current, recommended);
    if !can_scale(policy, keys, member, direction, now)? {
        debug!(
            cluster = %topology.cluster_ref(),
            component = %member,
            current,
            recommended,
            %direction,
            "scaling blocked by interval"
        );
        return Ok(ScaleOutcome::Blocked {
            current,
            recommended,
            direction,
        });
    }

    apply_scale(
        topology,
        policy,
        keys,
        ScaleChange {
            member,
            current,
            recommended,
        },
        &set.delete_slots,
        now,
    )?;
    info!(
        cluster = %topology.cluster_ref(),
        component = %member,
        from = current,
        to = recommended,
        %direction,
        "scaled"
    );
    Ok(ScaleOutcome::Applied {
        from: current,
        to: recommended,
        direction,
    })
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
