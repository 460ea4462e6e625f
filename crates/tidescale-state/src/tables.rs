//! redb table definitions for the Tidescale state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Autoscaling policies keyed by `{namespace}/{name}`.
pub const POLICIES: TableDefinition<&str, &[u8]> = TableDefinition::new("policies");

/// Cluster topologies keyed by `{namespace}/{name}`.
pub const CLUSTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("clusters");

/// Backing replica sets keyed by `{namespace}/{cluster}:{component}`.
pub const REPLICA_SETS: TableDefinition<&str, &[u8]> = TableDefinition::new("replica_sets");

/// Hot-region scheduling plans keyed by plan id.
pub const SCHEDULE_PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("schedule_plans");
