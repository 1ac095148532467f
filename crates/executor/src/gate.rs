//! Per-group mutual exclusion gate.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Atomic "available" flag of a callback group.
///
/// Closed by the selecting thread with a single compare-and-set, reopened by
/// the completion path. No external lock is needed.
///
/// # Example
///
/// ```rust
/// use prioexec_executor::CallbackGroupGate;
///
/// let gate = CallbackGroupGate::new();
/// assert!(gate.try_take());
/// assert!(!gate.try_take());
/// assert!(gate.release());
/// assert!(!gate.release());
/// ```
#[derive(Debug)]
pub struct CallbackGroupGate {
    available: AtomicBool,
    releases: AtomicU64,
}

impl Default for CallbackGroupGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackGroupGate {
    /// Create an open gate.
    pub const fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            releases: AtomicU64::new(0),
        }
    }

    /// True if no member of the group is selected or executing.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Close the gate. Returns false if it was already closed.
    #[inline]
    pub fn try_take(&self) -> bool {
        self.available
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Reopen the gate. Returns false if it was already open.
    ///
    /// Only an actual closed-to-open transition is counted.
    #[inline]
    pub fn release(&self) -> bool {
        let was_closed = !self.available.swap(true, Ordering::AcqRel);
        if was_closed {
            self.releases.fetch_add(1, Ordering::Relaxed);
        }
        was_closed
    }

    /// Number of closed-to-open transitions so far.
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_new_gate_is_open() {
        let gate = CallbackGroupGate::new();
        assert!(gate.is_available());
        assert_eq!(gate.release_count(), 0);
    }

    #[test]
    fn test_release_counts_transitions_only() {
        let gate = CallbackGroupGate::new();
        assert!(!gate.release());
        assert!(gate.try_take());
        assert!(gate.release());
        assert!(!gate.release());
        assert_eq!(gate.release_count(), 1);
    }

    #[test]
    fn test_single_winner_under_contention() {
        let gate = Arc::new(CallbackGroupGate::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if gate.try_take() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .unwrap_or_else(|_| panic!("contender panicked"));
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!gate.is_available());
    }
}
