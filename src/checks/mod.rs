//! Health checks
//!
//! A check probes one target and reports a [`CheckResult`]. Checks own their
//! failure handling: network errors, timeouts and bad samples all come back as
//! a failing result, never as an error.

pub mod http;
pub mod system;

use async_trait::async_trait;

use crate::CheckResult;

pub use http::{HttpCheck, HttpParams};
pub use system::{ResourceSample, ResourceSampler, SystemCheck, SystemParams, SysinfoSampler};

/// A pluggable unit of work run once per cycle.
///
/// Implementations must be `Send + Sync`; the engine runs every check on its
/// own task.
#[async_trait]
pub trait Check: Send + Sync {
    /// Unique name within one engine
    fn name(&self) -> &str;

    /// Run the probe. The returned result must carry [`Check::name`].
    async fn run(&self) -> CheckResult;
}
