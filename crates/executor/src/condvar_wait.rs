//! Default wait primitive built on a condition variable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::entities::WakeListener;
use crate::wait_set::{WaitPrimitive, WaitSet, WaitStatus};

#[derive(Debug, Default)]
struct Signal {
    wakes: Mutex<u64>,
    cond: Condvar,
}

impl WakeListener for Signal {
    fn wake(&self) {
        let mut wakes = self.wakes.lock();
        *wakes = wakes.wrapping_add(1);
        self.cond.notify_all();
    }
}

/// Blocks until a wake condition fires or the timeout elapses.
///
/// Source readiness is sampled with [`SourceHandle::is_ready`] on entry,
/// after every wake-up and once more at the deadline. A source that becomes
/// ready without triggering its node's [`WakeCondition`] is therefore seen
/// within one poll timeout; triggering the condition makes it immediate.
///
/// [`SourceHandle::is_ready`]: crate::SourceHandle::is_ready
/// [`WakeCondition`]: crate::WakeCondition
#[derive(Debug, Default)]
pub struct CondvarWait {
    signal: Arc<Signal>,
}

impl CondvarWait {
    /// Create a wait primitive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wake-ups delivered so far.
    pub fn wake_count(&self) -> u64 {
        *self.signal.wakes.lock()
    }
}

impl WaitPrimitive for CondvarWait {
    fn wait(&mut self, wait_set: &mut WaitSet, timeout: Duration) -> WaitStatus {
        if wait_set.is_empty() {
            return WaitStatus::Empty;
        }
        let deadline = Instant::now().checked_add(timeout);
        let mut wakes = self.signal.wakes.lock();
        loop {
            if wait_set.retain_ready(|source| source.handle().is_ready()) {
                return WaitStatus::Ready;
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            if remaining.is_zero() || self.signal.cond.wait_for(&mut wakes, remaining).timed_out() {
                break;
            }
        }
        drop(wakes);

        if wait_set.retain_ready(|source| source.handle().is_ready()) {
            WaitStatus::Ready
        } else {
            WaitStatus::Timeout
        }
    }

    fn wake_listener(&self) -> Option<Arc<dyn WakeListener>> {
        let signal: Arc<dyn WakeListener> = self.signal.clone();
        Some(signal)
    }
}
