//! Concurrency tests for prioexec-atomic.
//!
//! Workers of one executor share a single counter set and runtime tracker;
//! these tests hammer both from several threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prioexec_atomic::{DispatchCounters, RuntimeTracker};

#[test]
fn test_concurrent_cycles_and_dispatches() {
    let counters = Arc::new(DispatchCounters::new());
    let num_threads: u64 = 8;
    let cycles_per_thread: u64 = 10_000;

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let counters = Arc::clone(&counters);
            thread::spawn(move || {
                for i in 0..cycles_per_thread {
                    counters.inc_cycle();
                    match i % 4 {
                        0 => counters.inc_timer_dispatch(),
                        1 => counters.inc_subscription_dispatch(),
                        2 => counters.inc_dedup_rejection(),
                        _ => counters.inc_timeout(),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok(), "thread panicked unexpectedly");
    }

    let snapshot = counters.snapshot();
    let total = num_threads * cycles_per_thread;
    assert_eq!(snapshot.cycles, total);
    assert_eq!(snapshot.dispatched(), total / 2);
    assert_eq!(snapshot.dedup_rejections, total / 4);
    assert_eq!(snapshot.timeouts, total / 4);
}

#[test]
fn test_concurrent_runtime_max() {
    let tracker = Arc::new(RuntimeTracker::new());
    let num_threads: u64 = 6;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                for i in 0..1_000u64 {
                    tracker.record(Duration::from_nanos(thread_id * 1_000 + i));
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok(), "thread panicked unexpectedly");
    }

    let stats = tracker.stats();
    assert_eq!(stats.count, num_threads * 1_000);
    assert_eq!(stats.max_ns, (num_threads - 1) * 1_000 + 999);
}

#[test]
fn test_concurrent_snapshot_and_reset_loses_nothing() {
    let counters = Arc::new(DispatchCounters::new());
    let writers: u64 = 4;
    let per_writer: u64 = 20_000;

    let writer_handles: Vec<_> = (0..writers)
        .map(|_| {
            let counters = Arc::clone(&counters);
            thread::spawn(move || {
                for _ in 0..per_writer {
                    counters.inc_cycle();
                }
            })
        })
        .collect();

    let reader = {
        let counters = Arc::clone(&counters);
        thread::spawn(move || {
            let mut collected = 0u64;
            for _ in 0..200 {
                collected += counters.snapshot_and_reset().cycles;
                thread::yield_now();
            }
            collected
        })
    };

    for handle in writer_handles {
        assert!(handle.join().is_ok(), "writer panicked unexpectedly");
    }
    let collected = reader
        .join()
        .unwrap_or_else(|_| panic!("reader panicked unexpectedly"));

    let remaining = counters.snapshot().cycles;
    assert_eq!(collected + remaining, writers * per_writer);
}
