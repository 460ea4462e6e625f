//! tidescale-state — object model and embedded state store for Tidescale.
//!
//! Backed by [redb](https://docs.rs/redb), holds the snapshots the
//! autoscaling engine reads: autoscaling policies, cluster topologies,
//! the replica sets backing each component, and hot-region scheduling plans.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{namespace}/{name}`, `{namespace}/{cluster}:{component}`)
//! keep related records adjacent for prefix scans.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
