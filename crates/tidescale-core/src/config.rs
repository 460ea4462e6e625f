//! tidescale.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::duration::{DurationParseError, parse_duration_secs};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub controller: ControllerConfig,
    pub targets: TargetsConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// How often every policy is re-enqueued, e.g. "30s".
    pub resync_interval: String,
    /// Upper bound for the per-key requeue backoff, e.g. "5m".
    pub max_retry_backoff: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: "30s".to_string(),
            max_retry_backoff: "5m".to_string(),
        }
    }
}

/// Raw target replicas handed to the engine. Absent means "no recommendation".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub sql: Option<i32>,
    pub storage: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub data_dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/tidescale"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,tidescale=debug".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub enabled: Vec<String>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        // Surface bad durations at load time instead of on the first tick.
        config.resync_interval()?;
        config.max_retry_backoff()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Must be non-zero; the controller ticks on it.
    pub fn resync_interval(&self) -> anyhow::Result<Duration> {
        let secs = parse_duration_secs(&self.controller.resync_interval)?;
        if secs == 0 {
            anyhow::bail!(
                "controller.resync_interval {:?} must be greater than zero",
                self.controller.resync_interval
            );
        }
        Ok(Duration::from_secs(secs))
    }

    pub fn max_retry_backoff(&self) -> Result<Duration, DurationParseError> {
        parse_duration_secs(&self.controller.max_retry_backoff).map(Duration::from_secs)
    }

    /// Location of the redb file inside `state.data_dir`.
    pub fn db_path(&self) -> PathBuf {
        self.state.data_dir.join("tidescale.redb")
    }
}
