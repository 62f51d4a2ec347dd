//! Alert sinks
//!
//! An alert receives every result of every cycle and decides for itself
//! whether to act on it. Delivery errors are returned to the engine, which
//! logs them and moves on to the next alert.

pub mod console;
pub mod log;

use async_trait::async_trait;

use crate::CheckResult;

pub use console::ConsoleAlert;
pub use log::{LogAlert, LogParams};

#[async_trait]
pub trait Alert: Send + Sync {
    /// Short label used in engine logs
    fn name(&self) -> &str;

    /// React to a single result.
    async fn handle(&self, result: &CheckResult) -> anyhow::Result<()>;
}
