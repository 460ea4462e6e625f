//! tidescale-autoscale — interval-gated replica decisions for the SQL and
//! storage tiers of a managed database cluster.
//!
//! A pass takes an externally produced target for each component, clamps
//! it into the policy's bounds, and applies it only when the per-direction
//! cool-down since the last scale has elapsed. Scaling history lives in the
//! policy's annotation bag, so the engine itself is stateless between passes.
//!
//! # Layout
//!
//! - [`prerequisite`]: whether a component is settled enough to evaluate
//! - [`instances`]: the replica baseline a target is compared against
//! - [`clamp`]: bounding the raw target
//! - [`interval`]: the cool-down gate
//! - [`history`]: annotation keys and encodings
//! - [`applier`]: writing the decision back
//! - [`manager`]: the per-policy pipeline
//! - [`controller`] / [`queue`]: the retrying reconcile loop

pub mod applier;
pub mod clamp;
pub mod controller;
pub mod error;
pub mod history;
pub mod instances;
pub mod interval;
pub mod lister;
pub mod manager;
pub mod prerequisite;
pub mod queue;

#[cfg(test)]
mod testing;

pub use controller::Controller;
pub use error::{AutoScaleError, AutoScaleResult};
pub use history::HistoryKeys;
pub use interval::ScaleDirection;
pub use lister::{ClusterLister, StaticTargets, TargetProvider};
pub use manager::{
    AutoScalerControl, AutoScalerManager, Clock, ClusterSync, ScaleOutcome, SyncReport,
    sync_component,
};
pub use prerequisite::NotReadyReason;
pub use queue::RateLimitedQueue;
