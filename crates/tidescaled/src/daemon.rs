//! Daemon assembly around one state store.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use tidescale_autoscale::{AutoScalerManager, Clock, ClusterSync, Controller, StaticTargets};
use tidescale_core::DaemonConfig;
use tidescale_schedule::{
    PersistentPlanTable, PluginRegistry, SchedulePlanTable, SchedulerPlugin,
};
use tidescale_state::StateStore;

pub type Manager = AutoScalerManager<StateStore, StaticTargets>;

pub struct Daemon {
    store: StateStore,
    plugins: PluginRegistry,
    controller: Controller<Manager>,
}

/// Outcome of a single `sync` invocation, printed as JSON.
#[derive(Debug, Serialize)]
pub struct PassSummary {
    pub policy: String,
    /// False when the policy does not exist.
    pub found: bool,
    pub changed: bool,
    pub clusters: Vec<ClusterSync>,
    pub deferred: Vec<String>,
    pub errors: Vec<String>,
}

impl Daemon {
    /// Open the on-disk store under `state.data_dir` and assemble.
    pub fn open(config: &DaemonConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.state.data_dir)?;
        let db_path = config.db_path();
        let store = StateStore::open(&db_path)?;
        info!(path = ?db_path, "state store opened");
        Self::with_store(config, store)
    }

    pub fn with_store(config: &DaemonConfig, store: StateStore) -> anyhow::Result<Self> {
        let manager = AutoScalerManager::new(store.clone(), targets(config));
        Self::assemble(config, store, manager)
    }

    /// Assemble with an injected clock (unix seconds).
    pub fn with_store_and_clock(
        config: &DaemonConfig,
        store: StateStore,
        clock: Clock,
    ) -> anyhow::Result<Self> {
        let manager = AutoScalerManager::new(store.clone(), targets(config)).with_clock(clock);
        Self::assemble(config, store, manager)
    }

    fn assemble(
        config: &DaemonConfig,
        store: StateStore,
        manager: Manager,
    ) -> anyhow::Result<Self> {
        let plans: Arc<dyn SchedulePlanTable> = Arc::new(PersistentPlanTable::new(store.clone()));
        let plugins = PluginRegistry::from_names(&config.plugins.enabled, plans)?;
        info!(plugins = ?plugins.names(), "scheduler plugins registered");

        let controller = Controller::new(
            store.clone(),
            manager,
            config.resync_interval()?,
            config.max_retry_backoff()?,
        );
        Ok(Self {
            store,
            plugins,
            controller,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn controller_mut(&mut self) -> &mut Controller<Manager> {
        &mut self.controller
    }

    /// Run one committed pass over the policy stored under `key`.
    pub fn sync_policy(&self, key: &str) -> anyhow::Result<PassSummary> {
        let Some(report) = self.controller.reconcile_key(key)? else {
            return Ok(PassSummary {
                policy: key.to_string(),
                found: false,
                changed: false,
                clusters: Vec::new(),
                deferred: Vec::new(),
                errors: Vec::new(),
            });
        };

        Ok(PassSummary {
            policy: key.to_string(),
            found: true,
            changed: report.changed(),
            deferred: report.deferred(),
            errors: report.errors.iter().map(ToString::to_string).collect(),
            clusters: report.clusters,
        })
    }

    /// Run the controller and every plugin until `shutdown` fires.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let Self {
            plugins,
            mut controller,
            ..
        } = self;

        let mut handles = Vec::new();
        for name in plugins.names() {
            match plugins.resolve(&name) {
                Ok(plugin) => {
                    let rx = shutdown.clone();
                    handles.push(tokio::spawn(drive_plugin(plugin, rx)));
                }
                Err(e) => warn!(plugin = %name, error = %e, "plugin vanished before start"),
            }
        }

        controller.run(shutdown).await;
        join_plugins(handles).await;
    }
}

/// Wait for plugin tasks, logging any that panicked. Returns the panic count.
async fn join_plugins(handles: Vec<JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for handle in handles {
        match handle.await {
            Err(e) if e.is_panic() => {
                warn!(error = %e, "scheduler plugin task panicked");
                panicked += 1;
            }
            _ => {}
        }
    }
    panicked
}

fn targets(config: &DaemonConfig) -> StaticTargets {
    StaticTargets::new(config.targets.sql, config.targets.storage)
}

/// Call `prepare` on the plugin's adaptive interval until shutdown.
async fn drive_plugin(plugin: Arc<dyn SchedulerPlugin>, mut shutdown: watch::Receiver<bool>) {
    let mut interval: Duration = plugin.min_interval();
    info!(plugin = %plugin.name(), "scheduler plugin started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = plugin.prepare() {
                    warn!(plugin = %plugin.name(), error = %e, "plugin prepare failed");
                }
                interval = plugin.next_interval(interval);
            }
            _ = shutdown.changed() => {
                plugin.cleanup();
                info!(plugin = %plugin.name(), "scheduler plugin stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicked_plugin_task_is_counted() {
        let handles = vec![
            tokio::spawn(async {}),
            tokio::spawn(async { panic!("prepare blew up") }),
        ];
        assert_eq!(join_plugins(handles).await, 1);
    }

    #[tokio::test]
    async fn clean_plugin_shutdown_counts_nothing() {
        let (tx, rx) = watch::channel(false);
        let plans: Arc<dyn SchedulePlanTable> =
            Arc::new(tidescale_schedule::InMemoryPlanTable::new());
        let registry = PluginRegistry::from_names(&["user-base".to_string()], plans).unwrap();
        let plugin = registry.resolve("user-base").unwrap();

        let handle = tokio::spawn(drive_plugin(plugin, rx));
        tx.send(true).unwrap();
        assert_eq!(join_plugins(vec![handle]).await, 0);
    }
}
