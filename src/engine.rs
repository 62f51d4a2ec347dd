//! Monitoring engine
//!
//! The engine owns the registered checks and alerts together with the result
//! cache, and runs one cycle at a time.
//!
//! ## Cycle
//!
//! ```text
//! run_cycle ──► spawn one task per check (JoinSet)
//!                  │
//!                  ├─ check.run()            (panic → failing result)
//!                  ├─ cache.put(name, result)
//!                  └─ alert.handle(result)   for every alert, in order
//!               join all tasks ──► CycleReport
//! ```
//!
//! Alerts for one result always fire in registration order. Results of
//! different checks are dispatched as soon as each check finishes, so their
//! relative order is whatever order the checks complete in.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, trace, warn};

use crate::{
    CheckResult,
    alerts::Alert,
    cache::ResultCache,
    checks::Check,
    error::{MonitorError, MonitorResult},
};

/// Upper bound for a single alert invocation
const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No cycle running
    Idle,

    /// A cycle is in flight
    Running,

    /// Stopped for good, no further cycles are accepted
    Stopped,
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number
    pub cycle: u64,

    pub checks: usize,
    pub healthy: usize,
    pub failing: usize,
    pub elapsed: Duration,
}

pub struct MonitoringEngine {
    checks: Vec<Arc<dyn Check>>,
    alerts: Arc<Vec<Arc<dyn Alert>>>,
    cache: Arc<ResultCache>,

    /// Observable lifecycle state
    state: watch::Sender<EngineState>,

    /// Serializes cycles
    cycle_lock: Mutex<()>,

    cycles: AtomicU64,
    check_timeout: Option<Duration>,
    alert_timeout: Duration,
}

impl MonitoringEngine {
    pub fn new() -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            checks: Vec::new(),
            alerts: Arc::new(Vec::new()),
            cache: Arc::new(ResultCache::new()),
            state,
            cycle_lock: Mutex::new(()),
            cycles: AtomicU64::new(0),
            check_timeout: None,
            alert_timeout: DEFAULT_ALERT_TIMEOUT,
        }
    }

    /// Cap every check run at `timeout`, on top of whatever the check enforces
    /// itself. An overrun is recorded as a failing result.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn with_alert_timeout(mut self, timeout: Duration) -> Self {
        self.alert_timeout = timeout;
        self
    }

    /// Register a check. Names must be unique.
    pub async fn add_check(&mut self, check: Arc<dyn Check>) -> MonitorResult<()> {
        let name = check.name().to_string();
        self.cache.register(&name).await?;
        debug!("registered check {name}");
        self.checks.push(check);
        Ok(())
    }

    pub fn add_alert(&mut self, alert: Arc<dyn Alert>) {
        debug!("registered alert {}", alert.name());
        Arc::make_mut(&mut self.alerts).push(alert);
    }

    pub fn cache(&self) -> Arc<ResultCache> {
        Arc::clone(&self.cache)
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Receive every state transition (e.g. to redraw after a cycle).
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    /// Refuse further cycles. A cycle that is already running completes.
    pub fn stop(&self) {
        self.state.send_replace(EngineState::Stopped);
        debug!("engine stopped");
    }

    /// Run every check once and dispatch every result to every alert.
    ///
    /// Returns after all checks and all alert calls have finished. Cycles
    /// never overlap; a concurrent caller waits for the running cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> MonitorResult<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;

        let started = self.state.send_if_modified(|state| {
            if *state == EngineState::Idle {
                *state = EngineState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(MonitorError::EngineStopped);
        }
        // restores Idle even if this future is dropped mid-cycle
        let _running = RunningGuard(&self.state);

        let cycle = self.cycles.load(Ordering::SeqCst) + 1;
        let start = Instant::now();
        trace!("starting cycle {cycle} with {} checks", self.checks.len());

        let mut tasks = JoinSet::new();
        for check in &self.checks {
            tasks.spawn(execute_check(
                Arc::clone(check),
                Arc::clone(&self.alerts),
                Arc::clone(&self.cache),
                self.check_timeout,
                self.alert_timeout,
            ));
        }

        let mut report = CycleReport {
            cycle,
            checks: self.checks.len(),
            healthy: 0,
            failing: 0,
            elapsed: Duration::ZERO,
        };
        let mut violation = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(true)) => report.healthy += 1,
                Ok(Ok(false)) => report.failing += 1,
                Ok(Err(e)) => {
                    error!("cycle {cycle}: {e}");
                    violation.get_or_insert(e);
                }
                Err(e) => {
                    error!("cycle {cycle}: check task did not complete: {e}");
                    report.failing += 1;
                }
            }
        }

        self.cycles.store(cycle, Ordering::SeqCst);

        report.elapsed = start.elapsed();
        debug!(
            "cycle {cycle} finished in {:?}: {} healthy, {} failing",
            report.elapsed, report.healthy, report.failing
        );

        match violation {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Moves the engine back from `Running` to `Idle` when dropped. A concurrent
/// `stop()` wins.
struct RunningGuard<'a>(&'a watch::Sender<EngineState>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if *state == EngineState::Running {
                *state = EngineState::Idle;
                true
            } else {
                false
            }
        });
    }
}

impl Default for MonitoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One check's share of a cycle. Returns the result status.
#[instrument(skip_all, fields(check = %check.name()))]
async fn execute_check(
    check: Arc<dyn Check>,
    alerts: Arc<Vec<Arc<dyn Alert>>>,
    cache: Arc<ResultCache>,
    check_timeout: Option<Duration>,
    alert_timeout: Duration,
) -> MonitorResult<bool> {
    let name = check.name().to_string();
    let result = guarded_run(check.as_ref(), check_timeout).await;

    if result.name != name {
        return Err(MonitorError::ResultNameMismatch {
            expected: name,
            actual: result.name,
        });
    }

    let result = Arc::new(result);
    cache.put(&name, Arc::clone(&result)).await?;
    trace!("stored result (status: {})", result.status);

    for alert in alerts.iter() {
        dispatch(alert.as_ref(), &result, alert_timeout).await;
    }

    Ok(result.status)
}

/// Run a check, turning a panic or an engine-level timeout into a failing
/// result.
async fn guarded_run(check: &dyn Check, timeout: Option<Duration>) -> CheckResult {
    let run = AssertUnwindSafe(check.run()).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("check timed out after {limit:?}");
                return CheckResult::failure(
                    check.name(),
                    format!("Check timed out after {}s", limit.as_secs_f64()),
                );
            }
        },
        None => run.await,
    };

    outcome.unwrap_or_else(|panic| {
        let reason = panic_message(panic.as_ref());
        error!("check panicked: {reason}");
        CheckResult::failure(check.name(), format!("Check panicked: {reason}"))
    })
}

async fn dispatch(alert: &dyn Alert, result: &CheckResult, timeout: Duration) {
    let handled =
        tokio::time::timeout(timeout, AssertUnwindSafe(alert.handle(result)).catch_unwind()).await;

    match handled {
        Ok(Ok(Ok(()))) => trace!("alert {} handled result", alert.name()),
        Ok(Ok(Err(e))) => warn!("alert {} failed: {e:#}", alert.name()),
        Ok(Err(panic)) => error!(
            "alert {} panicked: {}",
            alert.name(),
            panic_message(panic.as_ref())
        ),
        Err(_) => warn!("alert {} timed out after {timeout:?}", alert.name()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
