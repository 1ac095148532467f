//! Snapshot tests for event formats.

use prioexec_tracing::{DispatchTraceEvent, LifecycleEvent, MARKER_LINE_LEN};

fn marker(event: DispatchTraceEvent) -> String {
    let mut buf = [0u8; MARKER_LINE_LEN];
    let len = event
        .write_marker(&mut buf)
        .unwrap_or_else(|e| panic!("marker did not fit: {e}"));
    String::from_utf8_lossy(buf.get(..len).unwrap_or_default()).into_owned()
}

#[test]
fn test_cycle_start_snapshot() {
    let event = DispatchTraceEvent::CycleStart {
        cycle: 42,
        timestamp_ns: 1_000_000_000,
    };
    insta::assert_snapshot!(event.to_string(), @"CycleStart(cycle=42, ts=1000000000ns)");
    insta::assert_snapshot!(marker(event), @"prioexec_cycle_start cycle=42 ts=1000000000");
}

#[test]
fn test_unit_selected_snapshot() {
    let event = DispatchTraceEvent::UnitSelected {
        cycle: 42,
        source_id: 7,
        kind: "subscription",
        timestamp_ns: 1_000_000_250,
    };
    insta::assert_snapshot!(
        event.to_string(),
        @"UnitSelected(cycle=42, source=7, kind=subscription, ts=1000000250ns)"
    );
    insta::assert_snapshot!(
        marker(event),
        @"prioexec_unit_selected cycle=42 source=7 kind=subscription ts=1000000250"
    );
}

#[test]
fn test_execute_end_snapshot() {
    let event = DispatchTraceEvent::ExecuteEnd {
        cycle: 42,
        source_id: 7,
        runtime_ns: 500,
        timestamp_ns: 1_000_000_750,
    };
    insta::assert_snapshot!(
        marker(event),
        @"prioexec_execute_end cycle=42 source=7 runtime=500 ts=1000000750"
    );
}

#[test]
fn test_wait_fault_snapshot() {
    let event = DispatchTraceEvent::WaitFault {
        cycle: 3,
        status: "error",
        timestamp_ns: 10,
    };
    insta::assert_snapshot!(event.to_string(), @"WaitFault(cycle=3, status=error, ts=10ns)");
}

#[test]
fn test_lifecycle_snapshot() {
    let event = LifecycleEvent::CallbackFailed {
        source_id: 12,
        reason: "sensor offline".to_string(),
    };
    insta::assert_snapshot!(event.to_string(), @"CallbackFailed(source=12, reason=sensor offline)");
}
