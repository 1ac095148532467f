//! Integration tests for worker real-time setup.

use prioexec_rt::{RTError, SetupStep, WorkerRtSetup, available_cores, priority_range};

#[test]
fn test_testing_preset_never_touches_scheduling() {
    let report = WorkerRtSetup::testing().apply(0);
    assert_eq!(report.scheduling, SetupStep::Skipped);
    assert_eq!(report.memory_lock, SetupStep::Skipped);
}

#[test]
fn test_apply_on_spawned_thread_reports_each_step() {
    let handle = std::thread::spawn(|| WorkerRtSetup::default().apply(1));
    let report = handle
        .join()
        .unwrap_or_else(|_| panic!("setup thread panicked"));

    // Without privileges scheduling may be refused; it must be reported, not hidden.
    match report.scheduling {
        SetupStep::Applied => {}
        SetupStep::Failed(RTError::SchedulingFailed { priority, .. }) => {
            let (_, max) = priority_range();
            assert!(priority <= max);
        }
        SetupStep::Failed(RTError::Unsupported) => {}
        other => panic!("unexpected scheduling outcome: {other:?}"),
    }
    assert_eq!(report.memory_lock, SetupStep::Skipped);
}

#[test]
fn test_core_id_wraps_around_available_cores() {
    let cores = available_cores();
    assert_eq!(cores, num_cpus::get().max(1));
    let handle = std::thread::spawn(move || WorkerRtSetup::testing().apply(cores * 3));
    let report = handle
        .join()
        .unwrap_or_else(|_| panic!("setup thread panicked"));
    assert!(!matches!(
        report.affinity,
        SetupStep::Failed(RTError::InvalidCore { .. })
    ));
}

#[test]
fn test_serde_defaults_fill_missing_fields() -> Result<(), serde_json::Error> {
    let setup: WorkerRtSetup = serde_json::from_str(r#"{ "realtime": false }"#)?;
    assert!(!setup.realtime);
    assert!(setup.pin_to_core);
    assert_eq!(setup.priority, 98);
    Ok(())
}
