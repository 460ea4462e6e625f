//! tidescale-schedule — collaborators for hot-region aware scheduling.
//!
//! Two capabilities live here, both independent of the autoscaling core:
//!
//! ```text
//! PluginRegistry  (name ─► Arc<dyn SchedulerPlugin>, built from config)
//!   └── UserBaseScheduler
//!         └── Arc<dyn SchedulePlanTable>
//!               ├── InMemoryPlanTable
//!               └── PersistentPlanTable (StateStore)
//! ```
//!
//! Other schedulers ask the plan table whether a region is predicted hot
//! before moving it.

pub mod error;
pub mod plan;
pub mod plugin;
pub mod registry;

pub use error::{ScheduleError, ScheduleResult};
pub use plan::{InMemoryPlanTable, PersistentPlanTable, SchedulePlanTable};
pub use plugin::{SchedulerPlugin, UserBaseScheduler};
pub use registry::PluginRegistry;
