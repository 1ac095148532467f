//! Property-based tests for marker formatting.

use prioexec_tracing::{DispatchTraceEvent, MARKER_LINE_LEN};
use proptest::prelude::*;

fn any_event() -> impl Strategy<Value = DispatchTraceEvent> {
    let kinds = prop::sample::select(vec![
        "timer",
        "subscription",
        "service",
        "client",
        "waitable",
    ]);
    prop_oneof![
        (any::<u64>(), any::<u64>()).prop_map(|(cycle, timestamp_ns)| {
            DispatchTraceEvent::CycleStart {
                cycle,
                timestamp_ns,
            }
        }),
        (any::<u64>(), any::<u64>(), kinds, any::<u64>()).prop_map(
            |(cycle, source_id, kind, timestamp_ns)| DispatchTraceEvent::UnitSelected {
                cycle,
                source_id,
                kind,
                timestamp_ns,
            }
        ),
        (any::<u64>(), any::<u64>(), any::<u64>()).prop_map(|(cycle, timer_id, timestamp_ns)| {
            DispatchTraceEvent::DedupRejected {
                cycle,
                timer_id,
                timestamp_ns,
            }
        }),
        (any::<u64>(), any::<u64>(), any::<u64>(), any::<u64>()).prop_map(
            |(cycle, source_id, runtime_ns, timestamp_ns)| DispatchTraceEvent::ExecuteEnd {
                cycle,
                source_id,
                runtime_ns,
                timestamp_ns,
            }
        ),
    ]
}

proptest! {
    #[test]
    fn test_marker_always_fits(event in any_event()) {
        let mut buf = [0u8; MARKER_LINE_LEN];
        let len = event.write_marker(&mut buf);
        prop_assert!(len.is_ok());
    }

    #[test]
    fn test_marker_names_event_type(event in any_event()) {
        let mut buf = [0u8; MARKER_LINE_LEN];
        if let Ok(len) = event.write_marker(&mut buf) {
            let line = String::from_utf8_lossy(buf.get(..len).unwrap_or_default()).into_owned();
            let prefix = format!("prioexec_{} cycle={}", event.event_type(), event.cycle());
            prop_assert!(line.starts_with(&prefix));
        }
    }
}
