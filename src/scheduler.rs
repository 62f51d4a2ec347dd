//! Cycle scheduler
//!
//! Drives a [`MonitoringEngine`] on a fixed interval until a shutdown future
//! resolves. The first cycle starts immediately. A cycle that has started is
//! always allowed to finish; shutdown is only observed between cycles, which
//! is where the scheduler spends almost all of its time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument};

use crate::{
    engine::MonitoringEngine,
    error::{MonitorError, MonitorResult},
};

/// Default polling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

pub struct Scheduler {
    engine: Arc<MonitoringEngine>,
    interval: Duration,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(engine: Arc<MonitoringEngine>, interval: Duration) -> MonitorResult<Self> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidInterval);
        }

        Ok(Self { engine, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn engine(&self) -> &Arc<MonitoringEngine> {
        &self.engine
    }

    /// Run cycles until `shutdown` resolves. Returns the number of completed
    /// cycles.
    ///
    /// An engine error (a broken check contract) stops the engine and is
    /// returned to the caller.
    #[instrument(skip_all, fields(interval = ?self.interval))]
    pub async fn run_until<F>(&self, shutdown: F) -> MonitorResult<u64>
    where
        F: Future,
    {
        debug!("starting scheduler");
        tokio::pin!(shutdown);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested after {completed} cycles");
                    break;
                }

                _ = ticker.tick() => {
                    match self.engine.run_cycle().await {
                        Ok(report) => {
                            completed += 1;
                            debug!(
                                "cycle {} done: {}/{} healthy",
                                report.cycle, report.healthy, report.checks
                            );
                        }
                        Err(e) => {
                            error!("stopping after engine error: {e}");
                            self.engine.stop();
                            return Err(e);
                        }
                    }
                }
            }
        }

        self.engine.stop();
        Ok(completed)
    }
}
