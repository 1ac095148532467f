//! Integration tests for the single-threaded executor.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use prioexec_errors::{ExecutorError, ProtocolError, WaitSetError};
use prioexec_executor::{
    Exclusivity, ExecutorOptions, Node, SelectionMode, SingleThreadExecutor, SourceKind,
    WaitStatus,
};
use prioexec_test_helpers::prelude::*;
use prioexec_tracing::TracingManager;
use prioexec_tracing::platform::FallbackProvider;
use tracing_test::traced_test;

fn options() -> ExecutorOptions {
    ExecutorOptions::default()
        .with_name("st-test")
        .with_poll_timeout(Duration::from_millis(2))
}

fn executor() -> SingleThreadExecutor {
    must(SingleThreadExecutor::new(options()))
}

fn scripted(wait: ScriptedWait) -> SingleThreadExecutor {
    must(SingleThreadExecutor::with_wait_primitive(options(), Box::new(wait)))
}

#[test]
fn test_timer_runs_before_subscription_in_same_cycle() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let group = node.create_callback_group(Exclusivity::Reentrant);
    group.add_source(
        SourceKind::Subscription,
        0,
        Arc::new(RecordingSource::new("sub", &log).with_pending(1)),
    );
    group.add_source(
        SourceKind::Timer,
        0,
        Arc::new(RecordingSource::new("timer", &log).with_pending(1)),
    );
    must(executor.add_node(&node));

    assert!(must(executor.spin_once(Duration::from_millis(50))));
    assert!(must(executor.spin_once(Duration::from_millis(50))));
    assert_eq!(log.entries(), vec!["timer", "sub"]);
}

#[test]
fn test_priority_mode_runs_nine_five_one() {
    let executor = must(SingleThreadExecutor::new(options().with_use_priorities(true)));
    assert_eq!(executor.selection_mode(), SelectionMode::Priority);

    let log = ExecutionLog::new();
    let node = Node::new("n");
    let group = node.create_callback_group(Exclusivity::Reentrant);
    for (label, priority) in [("five", 5), ("one", 1), ("nine", 9)] {
        group.add_source(
            SourceKind::Subscription,
            priority,
            Arc::new(RecordingSource::new(label, &log).with_pending(1)),
        );
    }
    must(executor.add_node(&node));

    for _ in 0..3 {
        assert!(must(executor.spin_once(Duration::from_millis(50))));
    }
    assert_eq!(log.entries(), vec!["nine", "five", "one"]);
}

#[test]
fn test_switching_to_priorities_at_runtime() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let group = node.create_callback_group(Exclusivity::Reentrant);
    group.add_source(
        SourceKind::Timer,
        1,
        Arc::new(RecordingSource::new("timer", &log).with_pending(1)),
    );
    group.add_source(
        SourceKind::Waitable,
        10,
        Arc::new(RecordingSource::new("waitable", &log).with_pending(1)),
    );
    must(executor.add_node(&node));

    executor.set_use_priorities(true);
    assert!(must(executor.spin_once(Duration::from_millis(50))));
    assert_eq!(log.entries(), vec!["waitable"]);
}

#[test]
fn test_spin_returns_after_shutdown_request() {
    let executor = Arc::new(executor());
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let source = Arc::new(RecordingSource::new("sub", &log).with_pending(3));
    node.add_source(SourceKind::Subscription, 0, source.clone());
    must(executor.add_node(&node));

    let spinner = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.spin())
    };
    assert!(wait_until(Duration::from_secs(5), || source.executions() == 3));

    let start = Instant::now();
    executor.request_shutdown();
    let result = spinner
        .join()
        .unwrap_or_else(|_| panic!("spinner panicked"));
    assert!(result.is_ok());
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!executor.is_spinning());
    assert_eq!(executor.counters().subscriptions, 3);
}

#[test]
fn test_reentrant_spin_fails_without_side_effects() {
    let executor = Arc::new(executor());
    let spinner = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.spin())
    };
    assert!(wait_until(Duration::from_secs(5), || executor.is_spinning()));

    let cycles_before = executor.counters().cycles;
    let second = executor.spin();
    assert!(matches!(
        second,
        Err(ExecutorError::Protocol(ProtocolError::AlreadySpinning))
    ));
    assert!(executor.is_spinning());
    assert!(executor.counters().cycles >= cycles_before);

    executor.request_shutdown();
    let result = spinner
        .join()
        .unwrap_or_else(|_| panic!("spinner panicked"));
    assert!(result.is_ok());
}

#[test]
fn test_gate_reset_once_per_execution() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    node.add_source(
        SourceKind::Subscription,
        0,
        Arc::new(RecordingSource::new("a", &log).with_pending(2)),
    );
    node.add_source(
        SourceKind::Service,
        0,
        Arc::new(RecordingSource::new("b", &log).with_pending(2)),
    );
    must(executor.add_node(&node));

    let mut ran = 0;
    for _ in 0..20 {
        if must(executor.spin_once(Duration::from_millis(5))) {
            ran += 1;
        }
        if ran == 4 {
            break;
        }
    }
    let gate = node.default_callback_group().gate();
    assert_eq!(ran, 4);
    assert!(gate.is_available());
    assert_eq!(gate.release_count(), 4);
}

#[test]
#[traced_test]
fn test_take_failure_skips_cycle_and_keeps_running() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let group = node.create_callback_group(Exclusivity::Reentrant);
    let broken = Arc::new(
        RecordingSource::new("broken", &log)
            .with_pending(1)
            .failing_takes(),
    );
    group.add_source(SourceKind::Timer, 0, broken.clone());
    group.add_source(
        SourceKind::Subscription,
        0,
        Arc::new(RecordingSource::new("ok", &log).with_pending(1)),
    );
    must(executor.add_node(&node));

    assert!(!must(executor.spin_once(Duration::from_millis(50))));
    assert!(must(executor.spin_once(Duration::from_millis(50))));

    assert_eq!(broken.takes(), 1);
    assert_eq!(log.entries(), vec!["ok"]);
    assert_eq!(executor.counters().take_failures, 1);
    assert!(logs_contain("Take failed"));
}

#[test]
fn test_callback_failure_surfaces_after_bookkeeping() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    node.add_source(
        SourceKind::Timer,
        0,
        Arc::new(
            RecordingSource::new("bad", &log)
                .with_pending(1)
                .failing_callback(),
        ),
    );
    must(executor.add_node(&node));

    let result = executor.spin();
    assert!(matches!(result, Err(ExecutorError::Callback { .. })));
    assert!(!executor.is_spinning());
    assert!(node.default_callback_group().gate().is_available());
    assert_eq!(executor.counters().callback_failures, 1);
}

#[test]
fn test_panicking_callback_surfaces_after_bookkeeping() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let source = Arc::new(
        RecordingSource::new("boom", &log)
            .with_pending(1)
            .panicking_callback(),
    );
    node.add_source(SourceKind::Service, 0, source.clone());
    must(executor.add_node(&node));

    let result = executor.spin();
    assert!(matches!(
        result,
        Err(ExecutorError::Callback { ref error, .. }) if error.to_string().contains("boom panicked in callback")
    ));
    assert!(!executor.is_spinning());
    assert_eq!(source.executions(), 1);
    let gate = node.default_callback_group().gate();
    assert!(gate.is_available());
    assert_eq!(gate.release_count(), 1);
}

#[test]
fn test_dropped_node_is_pruned() {
    let executor = executor();
    let log = ExecutionLog::new();
    let source = Arc::new(RecordingSource::new("orphan", &log).with_pending(1));
    {
        let node = Node::new("short-lived");
        node.add_source(SourceKind::Subscription, 0, source.clone());
        must(executor.add_node(&node));
    }

    assert!(!must(executor.spin_once(Duration::from_millis(5))));
    assert_eq!(source.executions(), 0);
    assert!(log.is_empty());
}

#[test]
fn test_removed_node_stops_dispatching() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let source = Arc::new(RecordingSource::new("s", &log).with_pending(2));
    node.add_source(SourceKind::Subscription, 0, source.clone());
    must(executor.add_node(&node));

    assert!(must(executor.spin_once(Duration::from_millis(50))));
    must(executor.remove_node(&node));
    assert!(!node.is_associated());
    assert!(!must(executor.spin_once(Duration::from_millis(5))));
    assert_eq!(source.executions(), 1);
}

#[test]
fn test_node_cannot_join_two_executors() {
    let first = executor();
    let second = executor();
    let node = Node::new("n");
    must(first.add_node(&node));
    assert!(matches!(
        second.add_node(&node),
        Err(ExecutorError::Protocol(ProtocolError::NodeAlreadyAdded { .. }))
    ));
}

#[test]
#[traced_test]
fn test_empty_wait_is_tolerated() {
    let wait = ScriptedWait::new().then(WaitStatus::Empty);
    let executor = scripted(wait);
    let log = ExecutionLog::new();
    let node = Node::new("n");
    node.add_source(
        SourceKind::Subscription,
        0,
        Arc::new(RecordingSource::new("s", &log).with_pending(1)),
    );
    must(executor.add_node(&node));

    assert!(!must(executor.spin_once(Duration::from_millis(5))));
    assert!(must(executor.spin_once(Duration::from_millis(50))));
    assert_eq!(executor.counters().empty_wait_sets, 1);
    assert!(logs_contain("Wait set was empty"));
}

#[test]
fn test_wait_error_ends_spin() {
    let wait = ScriptedWait::new().then(WaitStatus::Error("driver gone".into()));
    let executor = scripted(wait);

    let result = executor.spin();
    assert!(matches!(
        result,
        Err(ExecutorError::WaitSet(WaitSetError::Wait(ref reason))) if reason == "driver gone"
    ));
    assert!(!executor.is_spinning());
}

#[test]
fn test_trace_events_reach_the_provider() {
    let manager = TracingManager::with_provider(Box::new(FallbackProvider::new()));
    let executor = scripted(ScriptedWait::new().then(WaitStatus::Empty)).with_tracing(manager);
    let log = ExecutionLog::new();
    let node = Node::new("n");
    node.add_source(
        SourceKind::Client,
        0,
        Arc::new(RecordingSource::new("c", &log).with_pending(1)),
    );
    must(executor.add_node(&node));

    assert!(!must(executor.spin_once(Duration::from_millis(5))));
    assert!(must(executor.spin_once(Duration::from_millis(50))));

    let metrics = must_some(executor.tracing(), "tracing attached").metrics();
    // Two cycle starts, one selection, one execution end, one wait fault.
    assert_eq!(metrics.dispatch_events_emitted, 5);
    assert_eq!(metrics.wait_faults, 1);
    assert_eq!(metrics.lifecycle_events_emitted, 1);
}

#[test]
fn test_max_observed_runtime_tracks_slowest_callback() {
    let executor = executor();
    let log = ExecutionLog::new();
    let node = Node::new("n");
    let group = node.create_callback_group(Exclusivity::Reentrant);
    group.add_source(
        SourceKind::Timer,
        0,
        Arc::new(
            RecordingSource::new("slow", &log)
                .with_pending(1)
                .with_delay(Duration::from_millis(15)),
        ),
    );
    group.add_source(
        SourceKind::Subscription,
        0,
        Arc::new(RecordingSource::new("fast", &log).with_pending(1)),
    );
    must(executor.add_node(&node));

    assert!(must(executor.spin_once(Duration::from_millis(50))));
    assert!(must(executor.spin_once(Duration::from_millis(50))));
    assert!(executor.max_observed_runtime() >= Duration::from_millis(15));
}
