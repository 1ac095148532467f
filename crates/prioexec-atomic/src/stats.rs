//! Execution runtime tracking.
//!
//! [`RuntimeTracker`] accumulates how long each dispatched callback ran.
//! Workers on different cores record into it concurrently; the maximum is
//! kept with `fetch_max`, so the reported value never goes down until
//! [`RuntimeTracker::reset`] is called.

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

use crossbeam::utils::CachePadded;

/// Runtime statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeStats {
    /// Number of executions recorded
    pub count: u64,
    /// Sum of all execution times in nanoseconds
    pub total_ns: u64,
    /// Longest execution in nanoseconds
    pub max_ns: u64,
}

impl RuntimeStats {
    /// Mean execution time, or zero when nothing has been recorded.
    #[must_use]
    pub const fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_ns / self.count)
    }

    /// Longest execution time.
    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns)
    }

    /// Check if the longest execution exceeded a budget.
    #[must_use]
    pub fn exceeds(&self, budget: Duration) -> bool {
        self.max() > budget
    }
}

/// Lock-free execution runtime tracker.
///
/// Each field sits on its own cache line; every worker writes all three on
/// each execution.
///
/// # Example
///
/// ```rust
/// use prioexec_atomic::RuntimeTracker;
/// use std::time::Duration;
///
/// let tracker = RuntimeTracker::new();
/// tracker.record(Duration::from_micros(120));
/// tracker.record(Duration::from_micros(80));
///
/// let stats = tracker.stats();
/// assert_eq!(stats.count, 2);
/// assert_eq!(stats.max(), Duration::from_micros(120));
/// assert_eq!(stats.mean(), Duration::from_micros(100));
/// ```
#[derive(Debug, Default)]
pub struct RuntimeTracker {
    count: CachePadded<AtomicU64>,
    total_ns: CachePadded<AtomicU64>,
    max_ns: CachePadded<AtomicU64>,
}

impl RuntimeTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one execution.
    ///
    /// Durations beyond `u64::MAX` nanoseconds saturate.
    #[inline]
    pub fn record(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    /// Longest execution recorded so far.
    #[inline]
    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns.load(Ordering::Relaxed))
    }

    /// Snapshot of all statistics.
    #[must_use]
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            count: self.count.load(Ordering::Relaxed),
            total_ns: self.total_ns.load(Ordering::Relaxed),
            max_ns: self.max_ns.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics to zero.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.total_ns.store(0, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
    }
}
