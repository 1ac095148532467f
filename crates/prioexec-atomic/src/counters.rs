//! Atomic counters for dispatch-cycle accounting.
//!
//! [`DispatchCounters`] is shared by every worker of one executor. Each
//! worker records the outcome of its cycle (nothing ready, dispatched a unit
//! of some kind, lost a timer to another worker, failed to take data) with a
//! single relaxed fetch-add.
//!
//! # Ordering
//!
//! All counters use `Ordering::Relaxed`. They are statistics, never used to
//! synchronize with other memory, and a snapshot across counters is only
//! eventually consistent.

use core::sync::atomic::{AtomicU64, Ordering};

/// Counter snapshot returned by [`DispatchCounters::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Number of wait-select cycles run
    pub cycles: u64,
    /// Number of waits that ended on the poll timeout
    pub timeouts: u64,
    /// Number of waits reported on an empty wait set
    pub empty_wait_sets: u64,
    /// Number of timers dispatched
    pub timers: u64,
    /// Number of subscriptions dispatched
    pub subscriptions: u64,
    /// Number of services dispatched
    pub services: u64,
    /// Number of clients dispatched
    pub clients: u64,
    /// Number of waitables dispatched
    pub waitables: u64,
    /// Number of timers rejected because another worker owned them
    pub dedup_rejections: u64,
    /// Number of ready sources that failed to yield data
    pub take_failures: u64,
    /// Number of user callbacks that failed
    pub callback_failures: u64,
}

impl CounterSnapshot {
    /// Total number of units dispatched, all kinds together.
    #[must_use]
    pub const fn dispatched(&self) -> u64 {
        self.timers
            .saturating_add(self.subscriptions)
            .saturating_add(self.services)
            .saturating_add(self.clients)
            .saturating_add(self.waitables)
    }

    /// Fraction of cycles (in percent) that dispatched nothing.
    ///
    /// Returns 0.0 if no cycle has run.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "statistics only")]
    pub fn idle_cycle_percent(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        let idle = self.cycles.saturating_sub(self.dispatched());
        (idle as f64 / self.cycles as f64) * 100.0
    }
}

/// Atomic counters for dispatch-cycle accounting.
///
/// # Example
///
/// ```rust
/// use prioexec_atomic::DispatchCounters;
///
/// let counters = DispatchCounters::new();
/// counters.inc_cycle();
/// counters.inc_subscription_dispatch();
/// counters.inc_cycle();
/// counters.inc_timeout();
///
/// let snapshot = counters.snapshot();
/// assert_eq!(snapshot.cycles, 2);
/// assert_eq!(snapshot.dispatched(), 1);
/// ```
#[derive(Debug)]
pub struct DispatchCounters {
    cycles: AtomicU64,
    timeouts: AtomicU64,
    empty_wait_sets: AtomicU64,
    timers: AtomicU64,
    subscriptions: AtomicU64,
    services: AtomicU64,
    clients: AtomicU64,
    waitables: AtomicU64,
    dedup_rejections: AtomicU64,
    take_failures: AtomicU64,
    callback_failures: AtomicU64,
}

impl Default for DispatchCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchCounters {
    /// Create a new `DispatchCounters` with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            empty_wait_sets: AtomicU64::new(0),
            timers: AtomicU64::new(0),
            subscriptions: AtomicU64::new(0),
            services: AtomicU64::new(0),
            clients: AtomicU64::new(0),
            waitables: AtomicU64::new(0),
            dedup_rejections: AtomicU64::new(0),
            take_failures: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
        }
    }

    /// Increment the cycle counter and return the new cycle number.
    ///
    /// Called once per wait-select cycle, whether or not a unit was found.
    #[inline]
    pub fn inc_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Increment the poll-timeout counter.
    #[inline]
    pub fn inc_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the empty-wait-set counter.
    ///
    /// A correct collector never produces an empty wait set, so a non-zero
    /// value here points at a bookkeeping anomaly.
    #[inline]
    pub fn inc_empty_wait_set(&self) {
        self.empty_wait_sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched timer.
    #[inline]
    pub fn inc_timer_dispatch(&self) {
        self.timers.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched subscription.
    #[inline]
    pub fn inc_subscription_dispatch(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched service.
    #[inline]
    pub fn inc_service_dispatch(&self) {
        self.services.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched client.
    #[inline]
    pub fn inc_client_dispatch(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched waitable.
    #[inline]
    pub fn inc_waitable_dispatch(&self) {
        self.waitables.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timer rejected because another worker already owns it.
    #[inline]
    pub fn inc_dedup_rejection(&self) {
        self.dedup_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a ready source that failed to yield data.
    #[inline]
    pub fn inc_take_failure(&self) {
        self.take_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed user callback.
    #[inline]
    pub fn inc_callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counter values without resetting them.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            empty_wait_sets: self.empty_wait_sets.load(Ordering::Relaxed),
            timers: self.timers.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
            services: self.services.load(Ordering::Relaxed),
            clients: self.clients.load(Ordering::Relaxed),
            waitables: self.waitables.load(Ordering::Relaxed),
            dedup_rejections: self.dedup_rejections.load(Ordering::Relaxed),
            take_failures: self.take_failures.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
        }
    }

    /// Get a snapshot and reset all counters to zero.
    ///
    /// Not meant for worker threads; call it from whatever collects metrics.
    #[inline]
    #[must_use]
    pub fn snapshot_and_reset(&self) -> CounterSnapshot {
        CounterSnapshot {
            cycles: self.cycles.swap(0, Ordering::Relaxed),
            timeouts: self.timeouts.swap(0, Ordering::Relaxed),
            empty_wait_sets: self.empty_wait_sets.swap(0, Ordering::Relaxed),
            timers: self.timers.swap(0, Ordering::Relaxed),
            subscriptions: self.subscriptions.swap(0, Ordering::Relaxed),
            services: self.services.swap(0, Ordering::Relaxed),
            clients: self.clients.swap(0, Ordering::Relaxed),
            waitables: self.waitables.swap(0, Ordering::Relaxed),
            dedup_rejections: self.dedup_rejections.swap(0, Ordering::Relaxed),
            take_failures: self.take_failures.swap(0, Ordering::Relaxed),
            callback_failures: self.callback_failures.swap(0, Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    #[inline]
    pub fn reset(&self) {
        let _snapshot = self.snapshot_and_reset();
    }

    /// Get the current cycle count.
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Get the current dedup rejection count.
    #[inline]
    #[must_use]
    pub fn dedup_rejections(&self) -> u64 {
        self.dedup_rejections.load(Ordering::Relaxed)
    }
}
