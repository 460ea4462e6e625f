//! Name-to-plugin registry, populated once at startup.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::error::{ScheduleError, ScheduleResult};
use crate::plan::SchedulePlanTable;
use crate::plugin::{SchedulerPlugin, UserBaseScheduler};

pub type PluginCtor = fn(Arc<dyn SchedulePlanTable>) -> Arc<dyn SchedulerPlugin>;

/// Builtin plugins accepted in configuration, by name.
pub const BUILTIN_PLUGINS: &[(&str, PluginCtor)] = &[(UserBaseScheduler::NAME, user_base)];

fn user_base(plans: Arc<dyn SchedulePlanTable>) -> Arc<dyn SchedulerPlugin> {
    Arc::new(UserBaseScheduler::new(plans))
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<String, Arc<dyn SchedulerPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding the named builtins, all sharing `plans`.
    pub fn from_names(
        names: &[String],
        plans: Arc<dyn SchedulePlanTable>,
    ) -> ScheduleResult<Self> {
        let registry = Self::new();
        for name in names {
            let (_, build) = BUILTIN_PLUGINS
                .iter()
                .find(|(builtin, _)| *builtin == name.as_str())
                .ok_or_else(|| ScheduleError::UnknownPlugin(name.clone()))?;
            registry.register(name, build(plans.clone()))?;
        }
        Ok(registry)
    }

    pub fn register(&self, name: &str, plugin: Arc<dyn SchedulerPlugin>) -> ScheduleResult<()> {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        if plugins.contains_key(name) {
            return Err(ScheduleError::DuplicatePlugin(name.to_string()));
        }
        plugins.insert(name.to_string(), plugin);
        info!(plugin = %name, "scheduler plugin registered");
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> ScheduleResult<Arc<dyn SchedulerPlugin>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ScheduleError::UnknownPlugin(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
