pub mod alerts;
pub mod cache;
pub mod checks;
pub mod config;
#[cfg(feature = "dashboard")]
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use alerts::Alert;
pub use cache::{CacheEntry, ResultCache};
pub use checks::Check;
pub use engine::{CycleReport, EngineState, MonitoringEngine};
pub use error::{MonitorError, MonitorResult};
pub use registry::Registry;
pub use scheduler::Scheduler;

const EMPTY_MESSAGE: &str = "(no details)";

/// Outcome of a single check run.
///
/// Results are immutable once built. The timestamp is taken when the result is
/// constructed, not when it lands in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check that produced this result
    pub name: String,

    /// `true` if the target is healthy
    pub status: bool,

    /// Human readable detail (never empty)
    pub message: String,

    /// When the result was finalized
    pub timestamp: DateTime<Utc>,

    /// Elapsed time in seconds, `0.0` if it was not measured
    pub response_time: f64,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, status: bool, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            name: name.into(),
            status,
            message: if message.trim().is_empty() {
                EMPTY_MESSAGE.to_string()
            } else {
                message
            },
            timestamp: Utc::now(),
            response_time: 0.0,
        }
    }

    pub fn healthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, true, message)
    }

    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, false, message)
    }

    /// Attach a response time, clamping negative or non-finite values to zero.
    pub fn with_response_time(mut self, seconds: f64) -> Self {
        self.response_time = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            0.0
        };
        self
    }

    pub fn is_measured(&self) -> bool {
        self.response_time > 0.0
    }
}
