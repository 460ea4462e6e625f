//! tidescaled — the Tidescale daemon.
//!
//! Assembles the subsystems around one redb state store:
//! - Autoscaling manager + rate-limited controller loop
//! - Scheduler plugin registry with the persisted plan table
//! - Object bundle loading for `apply`
//!
//! # Usage
//!
//! ```text
//! tidescaled run   --config /etc/tidescale/tidescale.toml
//! tidescaled apply --config tidescale.toml --file objects.json
//! tidescaled sync  --config tidescale.toml --policy db/basic-autoscaler
//! ```

pub mod daemon;
pub mod objects;
pub mod telemetry;

pub use daemon::{Daemon, PassSummary};
pub use objects::{ApplySummary, ObjectBundle};
