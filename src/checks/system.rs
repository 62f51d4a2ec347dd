//! System resource check
//!
//! Samples global CPU and memory utilisation and compares both against
//! percentage thresholds. The check is healthy only while both values stay
//! strictly below their threshold.

use std::time::Instant;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use sysinfo::System;
use tokio::sync::Mutex;
use tracing::{instrument, trace, warn};

use crate::{CheckResult, checks::Check, util::round_millis};

/// Parameters accepted by the `system` check type
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SystemParams {
    #[serde(default = "default_threshold")]
    pub cpu_threshold: f32,

    #[serde(default = "default_threshold")]
    pub ram_threshold: f32,
}

fn default_threshold() -> f32 {
    80.0
}

impl Default for SystemParams {
    fn default() -> Self {
        Self {
            cpu_threshold: default_threshold(),
            ram_threshold: default_threshold(),
        }
    }
}

/// Utilisation percentages at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu: f32,
    pub ram: f32,
}

impl ResourceSample {
    pub fn is_within(&self, params: &SystemParams) -> bool {
        self.cpu < params.cpu_threshold && self.ram < params.ram_threshold
    }

    pub fn describe(&self, healthy: bool) -> String {
        let label = if healthy {
            "System Healthy"
        } else {
            "Resource Threshold Exceeded!"
        };
        format!("{label} (CPU: {:.1}% | RAM: {:.1}%)", self.cpu, self.ram)
    }
}

/// Source of resource samples.
///
/// The default implementation reads the host through `sysinfo`; tests inject
/// fixed values.
#[async_trait]
pub trait ResourceSampler: Send {
    async fn sample(&mut self) -> Result<ResourceSample>;
}

/// Samples the local host.
///
/// CPU usage is a delta between two refreshes, so the very first sample waits
/// for [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`]. Later samples compare against
/// the previous run.
pub struct SysinfoSampler {
    system: System,
    primed: bool,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            primed: false,
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceSampler for SysinfoSampler {
    async fn sample(&mut self) -> Result<ResourceSample> {
        if !self.primed {
            self.system.refresh_cpu_usage();
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
            self.primed = true;
        }

        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            bail!("memory information is unavailable");
        }

        Ok(ResourceSample {
            cpu: self.system.global_cpu_usage(),
            ram: (self.system.used_memory() as f64 / total as f64 * 100.0) as f32,
        })
    }
}

pub struct SystemCheck {
    name: String,
    params: SystemParams,
    sampler: Mutex<Box<dyn ResourceSampler>>,
}

impl SystemCheck {
    pub fn new(name: impl Into<String>, params: SystemParams) -> Self {
        Self::with_sampler(name, params, SysinfoSampler::new())
    }

    pub fn with_sampler(
        name: impl Into<String>,
        params: SystemParams,
        sampler: impl ResourceSampler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            sampler: Mutex::new(Box::new(sampler)),
        }
    }

    pub fn params(&self) -> SystemParams {
        self.params
    }
}

#[async_trait]
impl Check for SystemCheck {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(check = %self.name))]
    async fn run(&self) -> CheckResult {
        let start = Instant::now();
        let sample = self.sampler.lock().await.sample().await;
        let elapsed = round_millis(start.elapsed());

        match sample {
            Ok(sample) => {
                let healthy = sample.is_within(&self.params);
                trace!(
                    "cpu {:.1} (max: {}) ram {:.1} (max: {}) -> {healthy}",
                    sample.cpu, self.params.cpu_threshold, sample.ram, self.params.ram_threshold
                );
                CheckResult::new(&self.name, healthy, sample.describe(healthy))
                    .with_response_time(elapsed)
            }
            Err(e) => {
                warn!("resource sampling failed: {e:#}");
                CheckResult::failure(&self.name, format!("Resource sampling failed: {e}"))
            }
        }
    }
}
