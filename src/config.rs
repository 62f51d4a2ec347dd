use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    engine::MonitoringEngine,
    error::{MonitorError, MonitorResult},
    registry::Registry,
};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub checks: Vec<CheckConfig>,

    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    /// Polling interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Optional engine-level cap for a single check run, in seconds
    pub check_timeout: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            check_timeout: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlertConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

fn default_interval() -> u64 {
    10
}

impl Config {
    pub fn interval(&self) -> MonitorResult<Duration> {
        match self.settings.interval {
            0 => Err(MonitorError::InvalidInterval),
            secs => Ok(Duration::from_secs(secs)),
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Build a fully populated engine. Every entry is constructed before the
/// first cycle, so a bad entry fails here and not later.
pub async fn build_engine(config: &Config, registry: &Registry) -> MonitorResult<MonitoringEngine> {
    config.interval()?;

    let mut engine = MonitoringEngine::new();
    match config.settings.check_timeout {
        Some(0) => return Err(MonitorError::InvalidTimeout("check_timeout")),
        Some(secs) => engine = engine.with_check_timeout(Duration::from_secs(secs)),
        None => {}
    }

    for alert in &config.alerts {
        engine.add_alert(registry.create_alert(alert)?);
    }

    for check in &config.checks {
        engine.add_check(registry.create_check(check)?).await?;
    }

    debug!(
        "built engine with {} checks and {} alerts",
        config.checks.len(),
        config.alerts.len()
    );
    Ok(engine)
}

/// Convenience for callers that share the engine with a dashboard.
pub async fn build_shared_engine(
    config: &Config,
    registry: &Registry,
) -> MonitorResult<Arc<MonitoringEngine>> {
    build_engine(config, registry).await.map(Arc::new)
}
