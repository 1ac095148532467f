//! Property-based tests for prioexec-atomic.

use std::time::Duration;

use prioexec_atomic::{DispatchCounters, RuntimeTracker};
use quickcheck_macros::quickcheck;

#[quickcheck]
fn runtime_max_is_upper_bound(samples: Vec<u32>) -> bool {
    let tracker = RuntimeTracker::new();
    for &sample in &samples {
        tracker.record(Duration::from_nanos(u64::from(sample)));
    }

    let expected = samples.iter().copied().max().map_or(0, u64::from);
    tracker.stats().max_ns == expected && tracker.stats().count == samples.len() as u64
}

#[quickcheck]
fn runtime_mean_never_exceeds_max(samples: Vec<u32>) -> bool {
    let tracker = RuntimeTracker::new();
    for &sample in &samples {
        tracker.record(Duration::from_nanos(u64::from(sample)));
    }

    let stats = tracker.stats();
    stats.mean() <= stats.max()
}

#[quickcheck]
fn dispatched_never_exceeds_recorded(timers: u8, subscriptions: u8, rejections: u8) -> bool {
    let counters = DispatchCounters::new();
    for _ in 0..timers {
        counters.inc_timer_dispatch();
    }
    for _ in 0..subscriptions {
        counters.inc_subscription_dispatch();
    }
    for _ in 0..rejections {
        counters.inc_dedup_rejection();
    }

    let snapshot = counters.snapshot();
    snapshot.dispatched() == u64::from(timers) + u64::from(subscriptions)
        && snapshot.dedup_rejections == u64::from(rejections)
}
