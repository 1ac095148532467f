//! In-flight timer de-duplication.
//!
//! A timer can look ready to several workers before the one that selected it
//! has called into it. The multi-threaded executor checks a selected timer
//! into this set while it holds the low-priority side of its
//! [`TwoPriorityMutex`](crate::TwoPriorityMutex), and checks it out under the
//! high-priority side once execution finishes. A second worker that selects
//! the same timer in between finds it here and backs off.

use std::collections::HashSet;

use crate::entities::SourceId;

/// Set of timer identities currently checked out to a worker.
#[derive(Debug, Default)]
pub struct ScheduledTimerSet {
    in_flight: HashSet<SourceId>,
}

impl ScheduledTimerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a timer out. Returns false if another worker already owns it.
    pub fn try_insert(&mut self, timer: SourceId) -> bool {
        self.in_flight.insert(timer)
    }

    /// Check a timer back in. Returns false if it was not checked out.
    pub fn remove(&mut self, timer: SourceId) -> bool {
        self.in_flight.remove(&timer)
    }

    /// True if the timer is checked out.
    pub fn contains(&self, timer: SourceId) -> bool {
        self.in_flight.contains(&timer)
    }

    /// Number of timers in flight.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// True if no timer is in flight.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Any timer still checked out, lowest identity first.
    pub fn first(&self) -> Option<SourceId> {
        self.in_flight.iter().min().copied()
    }
}
