//! Concurrency tests
//!
//! These tests verify that:
//! - Readers never observe a half-written cache entry
//! - Concurrent `run_cycle` calls are serialized
//! - Many checks write distinct keys without losing updates

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sentinel::{Check, CheckResult, MonitoringEngine};

use crate::helpers::*;

/// Alternates between healthy and failing; the message encodes the run number
/// and whether that run was healthy.
struct AlternatingCheck {
    name: String,
    runs: AtomicUsize,
}

#[async_trait]
impl Check for AlternatingCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> CheckResult {
        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let healthy = run % 2 == 0;
        CheckResult::new(&self.name, healthy, format!("run {run} healthy={healthy}"))
            .with_response_time(run as f64)
    }
}

/// Tracks how many runs of this check are in flight at once
struct ExclusiveCheck {
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
}

#[async_trait]
impl Check for ExclusiveCheck {
    fn name(&self) -> &str {
        "exclusive"
    }

    async fn run(&self) -> CheckResult {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        CheckResult::healthy("exclusive", "ok")
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshot_never_sees_torn_entries() {
    let mut engine = MonitoringEngine::new();
    for i in 0..8 {
        engine
            .add_check(Arc::new(AlternatingCheck {
                name: format!("alt-{i}"),
                runs: AtomicUsize::new(0),
            }))
            .await
            .unwrap();
    }
    let engine = Arc::new(engine);
    let cache = engine.cache();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let done = done.clone();
        tokio::spawn(async move {
            let mut reads = 0;
            while !done.load(Ordering::SeqCst) {
                for entry in cache.snapshot().await {
                    let Some(result) = entry.result else {
                        continue;
                    };
                    let run = result.response_time as usize;
                    assert_eq!(result.name, entry.name);
                    assert_eq!(
                        result.message,
                        format!("run {run} healthy={}", result.status)
                    );
                    assert_eq!(result.status, run % 2 == 0);
                }
                reads += 1;
                tokio::task::yield_now().await;
            }
            reads
        })
    };

    for _ in 0..50 {
        engine.run_cycle().await.unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let reads = reader.await.unwrap();
    assert!(reads > 0);
    assert_eq!(engine.cycles_completed(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cycles_do_not_overlap() {
    let check = Arc::new(ExclusiveCheck {
        in_flight: AtomicUsize::new(0),
        overlapped: AtomicBool::new(false),
    });
    let mut engine = MonitoringEngine::new();
    engine.add_check(check.clone()).await.unwrap();
    let engine = Arc::new(engine);

    let mut tasks = vec![];
    for _ in 0..4 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move { engine.run_cycle().await }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(!check.overlapped.load(Ordering::SeqCst));
    assert_eq!(engine.cycles_completed(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_checks_fill_distinct_slots() {
    let mut engine = MonitoringEngine::new();
    for i in 0..64 {
        let check = if i % 3 == 0 {
            FakeCheck::failing(&format!("check-{i}"))
        } else {
            FakeCheck::healthy(&format!("check-{i}"))
        };
        engine.add_check(Arc::new(check)).await.unwrap();
    }

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.checks, 64);
    assert_eq!(report.failing, 22);
    assert_eq!(report.healthy, 42);

    let snapshot = engine.cache().snapshot().await;
    assert_eq!(snapshot.len(), 64);
    for (i, entry) in snapshot.iter().enumerate() {
        assert_eq!(entry.name, format!("check-{i}"));
        let result = entry.result.as_ref().unwrap();
        assert_eq!(result.status, i % 3 != 0);
    }
}
