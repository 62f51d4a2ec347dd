//! Cycle orchestration tests
//!
//! These tests verify that:
//! - Every registered check has exactly one cache entry after a cycle
//! - Misbehaving checks and alerts do not break the cycle
//! - Alerts run once per result, in registration order
//! - Checks really run concurrently

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sentinel::{EngineState, MonitorError, MonitoringEngine};

use crate::helpers::*;

#[tokio::test]
async fn test_cache_has_one_entry_per_check_after_cycle() {
    let mut engine = MonitoringEngine::new();
    for name in ["web", "db", "queue"] {
        engine
            .add_check(Arc::new(FakeCheck::healthy(name)))
            .await
            .unwrap();
    }

    let cache = engine.cache();
    assert!(cache.snapshot().await.iter().all(|entry| entry.result.is_none()));

    engine.run_cycle().await.unwrap();

    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.len(), 3);
    for entry in &snapshot {
        let result = entry.result.as_ref().expect("entry should be filled");
        assert_eq!(result.name, entry.name);
    }
}

#[tokio::test]
async fn test_engine_survives_pathological_check() {
    let journal = journal();
    let mut engine = MonitoringEngine::new();
    engine
        .add_check(Arc::new(PanickingCheck("chaos")))
        .await
        .unwrap();
    engine
        .add_check(Arc::new(FakeCheck::healthy("steady")))
        .await
        .unwrap();
    engine.add_alert(Arc::new(RecordingAlert::new("console", &journal)));

    for _ in 0..3 {
        engine.run_cycle().await.unwrap();
    }

    let chaos = engine.cache().get("chaos").await.unwrap();
    assert!(!chaos.status);
    assert!(chaos.message.contains("chaos lost its mind"));

    let steady = engine.cache().get("steady").await.unwrap();
    assert!(steady.status);

    assert_eq!(journal.lock().unwrap().len(), 6);
    assert_eq!(engine.cycles_completed(), 3);
}

#[tokio::test]
async fn test_alerts_fire_in_registration_order_per_result() {
    let journal = journal();
    let mut engine = MonitoringEngine::new();
    engine
        .add_check(Arc::new(FakeCheck::healthy("fast")))
        .await
        .unwrap();
    engine
        .add_check(Arc::new(
            FakeCheck::failing("slow").with_delay(Duration::from_millis(20)),
        ))
        .await
        .unwrap();
    engine.add_alert(Arc::new(RecordingAlert::new("first", &journal)));
    engine.add_alert(Arc::new(RecordingAlert::new("second", &journal)));
    engine.add_alert(Arc::new(RecordingAlert::new("third", &journal)));

    engine.run_cycle().await.unwrap();

    let entries = journal.lock().unwrap().clone();
    assert_eq!(entries.len(), 6);

    for check in ["fast", "slow"] {
        let labels: Vec<_> = entries
            .iter()
            .filter(|(_, name, _)| name == check)
            .map(|(label, _, _)| label.as_str())
            .collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
    }
}

#[tokio::test]
async fn test_failure_filtered_alert_counts() {
    let journal = journal();
    let mut engine = MonitoringEngine::new();
    engine
        .add_check(Arc::new(FakeCheck::healthy("up")))
        .await
        .unwrap();
    engine
        .add_check(Arc::new(FakeCheck::failing("down")))
        .await
        .unwrap();
    engine.add_alert(Arc::new(RecordingAlert::new("console", &journal)));
    engine.add_alert(Arc::new(RecordingAlert::failures_only("log", &journal)));

    engine.run_cycle().await.unwrap();

    let entries = journal.lock().unwrap().clone();
    let console: Vec<_> = entries.iter().filter(|(l, _, _)| l == "console").collect();
    let log: Vec<_> = entries.iter().filter(|(l, _, _)| l == "log").collect();

    assert_eq!(console.len(), 2);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].1, "down");
}

#[tokio::test]
async fn test_broken_alerts_do_not_block_siblings() {
    let journal = journal();
    let mut engine = MonitoringEngine::new();
    engine
        .add_check(Arc::new(FakeCheck::failing("db")))
        .await
        .unwrap();
    engine.add_alert(Arc::new(FailingAlert));
    engine.add_alert(Arc::new(PanickingAlert));
    engine.add_alert(Arc::new(RecordingAlert::new("last", &journal)));

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.failing, 1);

    let entries = journal.lock().unwrap().clone();
    assert_eq!(entries, vec![("last".to_string(), "db".to_string(), false)]);
}

#[tokio::test(start_paused = true)]
async fn test_stuck_alert_is_bounded() {
    let journal = journal();
    let mut engine = MonitoringEngine::new().with_alert_timeout(Duration::from_secs(1));
    engine
        .add_check(Arc::new(FakeCheck::healthy("web")))
        .await
        .unwrap();
    engine.add_alert(Arc::new(StuckAlert));
    engine.add_alert(Arc::new(RecordingAlert::new("after", &journal)));

    let start = tokio::time::Instant::now();
    engine.run_cycle().await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(journal.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_checks_run_concurrently() {
    let mut engine = MonitoringEngine::new();
    for i in 0..5 {
        engine
            .add_check(Arc::new(
                FakeCheck::healthy(&format!("slow-{i}")).with_delay(Duration::from_secs(2)),
            ))
            .await
            .unwrap();
    }

    let start = tokio::time::Instant::now();
    let report = engine.run_cycle().await.unwrap();

    // serialized execution would take 10s
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(report.healthy, 5);
}

#[tokio::test]
async fn test_repeated_cycles_are_stable() {
    let check = Arc::new(FakeCheck::failing("flaky"));
    let mut engine = MonitoringEngine::new();
    engine.add_check(check.clone()).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        engine.run_cycle().await.unwrap();
        seen.push(engine.cache().get("flaky").await.unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(check.runs.load(Ordering::SeqCst), 4);
    for pair in seen.windows(2) {
        assert_eq!(pair[0].status, pair[1].status);
        assert_eq!(pair[0].message, pair[1].message);
        assert!(pair[1].timestamp > pair[0].timestamp);
    }
}

#[tokio::test]
async fn test_engine_returns_to_idle() {
    let mut engine = MonitoringEngine::new();
    engine
        .add_check(Arc::new(FakeCheck::healthy("web")))
        .await
        .unwrap();
    let mut state = engine.subscribe();

    assert_eq!(engine.state(), EngineState::Idle);
    engine.run_cycle().await.unwrap();
    assert_eq!(*state.borrow_and_update(), EngineState::Idle);

    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(engine.run_cycle().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_cycle_leaves_engine_usable() {
    let check = Arc::new(FakeCheck::healthy("slow").with_delay(Duration::from_secs(5)));
    let mut engine = MonitoringEngine::new();
    engine.add_check(check.clone()).await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), engine.run_cycle()).await;
    assert!(abandoned.is_err());
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.cycles_completed(), 0);
    assert!(engine.cache().get("slow").await.is_none());

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.cycle, 1);
    assert_eq!(report.healthy, 1);
    assert_eq!(check.runs.load(Ordering::SeqCst), 2);
    assert!(engine.cache().get("slow").await.unwrap().status);
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_blank_check_name_is_rejected() {
    let mut engine = MonitoringEngine::new();

    let err = engine
        .add_check(Arc::new(FakeCheck::healthy("")))
        .await
        .unwrap_err();
    assert_eq!(err, MonitorError::EmptyCheckName);
    assert!(engine.check_names().is_empty());
    assert!(engine.cache().is_empty().await);
}
