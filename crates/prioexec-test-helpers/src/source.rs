//! Recording source handles.
//!
//! [`RecordingSource`] is a [`SourceHandle`] with a pending-work counter. It
//! logs every execution into a shared [`ExecutionLog`] and can report how
//! many callbacks overlapped through a [`ConcurrencyProbe`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use prioexec_errors::{CallbackError, TakeError};
use prioexec_executor::{Payload, SourceHandle};

/// Shared, ordered record of executed callbacks.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl ExecutionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, label: &'static str) {
        self.entries.lock().push(label);
    }

    /// Snapshot of all entries in execution order.
    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing ran yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries with `label`.
    pub fn count(&self, label: &str) -> usize {
        self.entries.lock().iter().filter(|e| **e == label).count()
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    current: AtomicUsize,
    high_water: AtomicUsize,
}

/// Tracks how many callbacks sharing this probe run at the same time.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    state: Arc<ProbeState>,
}

impl ConcurrencyProbe {
    /// Create a probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a callback as running until the guard drops.
    pub fn enter(&self) -> ProbeGuard {
        let now = self.state.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.high_water.fetch_max(now, Ordering::SeqCst);
        ProbeGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Callbacks running right now.
    pub fn current(&self) -> usize {
        self.state.current.load(Ordering::SeqCst)
    }

    /// Most callbacks ever seen running at once.
    pub fn high_water(&self) -> usize {
        self.state.high_water.load(Ordering::SeqCst)
    }
}

/// Returned by [`ConcurrencyProbe::enter`].
#[derive(Debug)]
pub struct ProbeGuard {
    state: Arc<ProbeState>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.state.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Source handle with scripted readiness and failures.
///
/// By default `take` consumes one pending item. A *sticky* source (timer
/// style) keeps reporting ready while its callback is in flight and only
/// consumes the item when the callback finishes.
#[derive(Debug)]
pub struct RecordingSource {
    label: &'static str,
    pending: AtomicUsize,
    sticky: bool,
    fail_takes: AtomicBool,
    fail_callback: AtomicBool,
    panic_on_take: bool,
    panic_on_execute: bool,
    delay: Duration,
    log: ExecutionLog,
    probe: Option<ConcurrencyProbe>,
    executions: AtomicUsize,
    takes: AtomicUsize,
}

impl RecordingSource {
    /// Create a source with nothing pending.
    pub fn new(label: &'static str, log: &ExecutionLog) -> Self {
        Self {
            label,
            pending: AtomicUsize::new(0),
            sticky: false,
            fail_takes: AtomicBool::new(false),
            fail_callback: AtomicBool::new(false),
            panic_on_take: false,
            panic_on_execute: false,
            delay: Duration::ZERO,
            log: log.clone(),
            probe: None,
            executions: AtomicUsize::new(0),
            takes: AtomicUsize::new(0),
        }
    }

    /// Start with `count` pending items.
    pub fn with_pending(self, count: usize) -> Self {
        self.pending.store(count, Ordering::SeqCst);
        self
    }

    /// Stay ready until the callback finishes.
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Sleep this long inside every callback.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report overlap through `probe`.
    pub fn with_probe(mut self, probe: &ConcurrencyProbe) -> Self {
        self.probe = Some(probe.clone());
        self
    }

    /// Fail every take.
    pub fn failing_takes(self) -> Self {
        self.set_fail_takes(true);
        self
    }

    /// Fail every callback.
    pub fn failing_callback(self) -> Self {
        self.fail_callback.store(true, Ordering::SeqCst);
        self
    }

    /// Panic inside every take.
    pub fn panicking_take(mut self) -> Self {
        self.panic_on_take = true;
        self
    }

    /// Panic inside every callback, after it was logged.
    pub fn panicking_callback(mut self) -> Self {
        self.panic_on_execute = true;
        self
    }

    /// Switch take failures on or off.
    pub fn set_fail_takes(&self, fail: bool) {
        self.fail_takes.store(fail, Ordering::SeqCst);
    }

    /// Add pending items.
    pub fn add_pending(&self, count: usize) {
        self.pending.fetch_add(count, Ordering::SeqCst);
    }

    /// Pending items left.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Callbacks run so far.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Take attempts so far, failed ones included.
    pub fn takes(&self) -> usize {
        self.takes.load(Ordering::SeqCst)
    }

    fn consume(&self) -> bool {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl SourceHandle for RecordingSource {
    fn is_ready(&self) -> bool {
        self.pending() > 0
    }

    fn take(&self) -> Result<Option<Payload>, TakeError> {
        self.takes.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_take {
            panic!("{} panicked in take", self.label);
        }
        if self.fail_takes.load(Ordering::SeqCst) {
            self.consume();
            return Err(TakeError::failed(format!("{} refused to take", self.label)));
        }
        let available = if self.sticky {
            self.pending() > 0
        } else {
            self.consume()
        };
        Ok(available.then(|| Box::new(self.label) as Payload))
    }

    fn execute(&self, _payload: &mut Payload) -> Result<(), CallbackError> {
        let _running = self.probe.as_ref().map(ConcurrencyProbe::enter);
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.log.record(self.label);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.sticky {
            self.consume();
        }
        if self.panic_on_execute {
            panic!("{} panicked in callback", self.label);
        }
        if self.fail_callback.load(Ordering::SeqCst) {
            return Err(CallbackError::new(format!("{} callback failed", self.label)));
        }
        Ok(())
    }
}
