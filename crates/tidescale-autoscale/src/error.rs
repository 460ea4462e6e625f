//! Autoscaler error types.
//!
//! Not-found lookups never reach this type; they are treated as a
//! successful no-op where they are detected.

use thiserror::Error;

use tidescale_state::{MemberType, StateError};

/// Errors surfaced by a reconciliation pass.
#[derive(Debug, Error)]
pub enum AutoScaleError {
    /// Not ready to evaluate yet; retry soon without raising an alarm.
    #[error("still need sync: {0}")]
    Requeue(String),

    /// Malformed bounds, intervals or stored history on the policy.
    #[error("invalid autoscaling config: {0}")]
    Config(String),

    /// The pending-ordinal annotation could not be encoded or decoded.
    #[error("scale-out ordinal annotation: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    /// Attaches the cluster (and component) an error came from.
    #[error("{cluster}{}: {source}", component_suffix(.component))]
    InCluster {
        cluster: String,
        component: Option<MemberType>,
        #[source]
        source: Box<AutoScaleError>,
    },

    /// Independent errors collected across one pass.
    #[error("[{}]", join_errors(.0))]
    Aggregate(Vec<AutoScaleError>),
}

pub type AutoScaleResult<T> = Result<T, AutoScaleError>;

fn component_suffix(component: &Option<MemberType>) -> String {
    component.map(|c| format!(" [{c}]")).unwrap_or_default()
}

fn join_errors(errs: &[AutoScaleError]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AutoScaleError {
    /// Collapse a list of errors: none is success, one is returned as-is.
    pub fn aggregate(mut errs: Vec<AutoScaleError>) -> AutoScaleResult<()> {
        match errs.len() {
            0 => Ok(()),
            1 => Err(errs.remove(0)),
            _ => Err(AutoScaleError::Aggregate(errs)),
        }
    }

    pub fn in_cluster(self, cluster: &str, component: Option<MemberType>) -> Self {
        AutoScaleError::InCluster {
            cluster: cluster.to_string(),
            component,
            source: Box::new(self),
        }
    }

    /// Whether the caller should retry quietly rather than report a failure.
    pub fn is_transient(&self) -> bool {
        match self {
            AutoScaleError::Requeue(_) => true,
            AutoScaleError::InCluster { source, .. } => source.is_transient(),
            AutoScaleError::Aggregate(errs) => errs.iter().all(AutoScaleError::is_transient),
            _ => false,
        }
    }
}
