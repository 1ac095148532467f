//! Mutex with a high-priority and a low-priority acquisition path.
//!
//! One resource, two doors. A thread waiting at the high-priority door is
//! always let in before any thread waiting at the low-priority door,
//! whichever arrived first. The multi-threaded executor guards its long
//! rebuild-wait-select section with the low door and the short timer
//! check-in after execution with the high door, so check-in latency does not
//! grow with the number of polling workers.
//!
//! Ownership of the resource is a token tracked under a small state mutex
//! with one condition variable per door. The protected value sits in its own
//! mutex, which is uncontended while the token is held.

use core::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Acquisition path used for a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPriority {
    /// Served first under contention
    High,
    /// Served only when no high-priority waiter is queued
    Low,
}

#[derive(Debug, Default)]
struct TokenState {
    taken: bool,
    high_waiting: usize,
}

#[derive(Debug, Default)]
struct Doors {
    state: Mutex<TokenState>,
    high: Condvar,
    low: Condvar,
}

impl Doors {
    fn acquire_high(&self) {
        let mut state = self.state.lock();
        if state.taken {
            state.high_waiting = state.high_waiting.saturating_add(1);
            while state.taken {
                self.high.wait(&mut state);
            }
            state.high_waiting = state.high_waiting.saturating_sub(1);
        }
        state.taken = true;
    }

    fn acquire_low(&self) {
        let mut state = self.state.lock();
        while state.taken || state.high_waiting > 0 {
            self.low.wait(&mut state);
        }
        state.taken = true;
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.taken = false;
        if state.high_waiting > 0 {
            self.high.notify_one();
        } else {
            self.low.notify_one();
        }
    }
}

struct Token<'a> {
    doors: &'a Doors,
}

impl Drop for Token<'_> {
    fn drop(&mut self) {
        self.doors.release();
    }
}

/// Mutual exclusion with strict high-over-low precedence.
///
/// # Example
///
/// ```rust
/// use prioexec_executor::{LockPriority, TwoPriorityMutex};
///
/// let mutex = TwoPriorityMutex::new(0u32);
/// {
///     let mut guard = mutex.lock_low();
///     *guard += 1;
/// }
/// let guard = mutex.lock_high();
/// assert_eq!(*guard, 1);
/// assert_eq!(guard.priority(), LockPriority::High);
/// ```
#[derive(Debug, Default)]
pub struct TwoPriorityMutex<T> {
    doors: Doors,
    data: Mutex<T>,
}

impl<T> TwoPriorityMutex<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self {
            doors: Doors::default(),
            data: Mutex::new(value),
        }
    }

    /// Acquire through the high-priority door.
    pub fn lock_high(&self) -> PriorityGuard<'_, T> {
        self.doors.acquire_high();
        self.guard(LockPriority::High)
    }

    /// Acquire through the low-priority door.
    pub fn lock_low(&self) -> PriorityGuard<'_, T> {
        self.doors.acquire_low();
        self.guard(LockPriority::Low)
    }

    /// Number of threads queued at the high-priority door.
    pub fn high_waiting(&self) -> usize {
        self.doors.state.lock().high_waiting
    }

    /// Consume the mutex and return the value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn guard(&self, priority: LockPriority) -> PriorityGuard<'_, T> {
        PriorityGuard {
            data: self.data.lock(),
            _token: Token { doors: &self.doors },
            priority,
        }
    }
}

/// Access to the value of a [`TwoPriorityMutex`].
///
/// Dropping the guard releases the value first, then hands the token to the
/// next waiter.
pub struct PriorityGuard<'a, T> {
    // Field order is drop order.
    data: MutexGuard<'a, T>,
    _token: Token<'a>,
    priority: LockPriority,
}

impl<T> PriorityGuard<'_, T> {
    /// Door this guard came through.
    pub fn priority(&self) -> LockPriority {
        self.priority
    }
}

impl<T> Deref for PriorityGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for PriorityGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for PriorityGuard<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PriorityGuard")
            .field("priority", &self.priority)
            .field("data", &*self.data)
            .finish()
    }
}
