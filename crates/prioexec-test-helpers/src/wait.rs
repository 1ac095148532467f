//! Wait primitives for tests.
//!
//! [`ScriptedWait`] behaves like the executor's [`CondvarWait`] except that
//! queued statuses are returned first, one per call. Queue `Empty` or
//! `Error` to exercise the fault paths of a run loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use prioexec_executor::{CondvarWait, WaitPrimitive, WaitSet, WaitStatus, WakeListener};

/// Handle for queueing statuses into a [`ScriptedWait`] after it has been
/// boxed into an executor.
#[derive(Debug, Clone, Default)]
pub struct WaitScript {
    queue: Arc<Mutex<VecDeque<WaitStatus>>>,
    calls: Arc<AtomicUsize>,
}

impl WaitScript {
    /// Queue a status for a future wait.
    pub fn push(&self, status: WaitStatus) {
        self.queue.lock().push_back(status);
    }

    /// Number of queued statuses not yet returned.
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }

    /// Number of waits so far, scripted or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Block until at least `calls` waits have happened or `timeout` elapses.
    pub fn wait_for_calls(&self, calls: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.calls() >= calls)
    }
}

/// A [`CondvarWait`] with a queue of canned statuses in front.
#[derive(Debug, Default)]
pub struct ScriptedWait {
    inner: CondvarWait,
    script: WaitScript,
}

impl ScriptedWait {
    /// Create a wait with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status; builder form of [`WaitScript::push`].
    pub fn then(self, status: WaitStatus) -> Self {
        self.script.push(status);
        self
    }

    /// Handle to the script.
    pub fn script(&self) -> WaitScript {
        self.script.clone()
    }
}

impl WaitPrimitive for ScriptedWait {
    fn wait(&mut self, wait_set: &mut WaitSet, timeout: Duration) -> WaitStatus {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.queue.lock().pop_front();
        match scripted {
            Some(status) => status,
            None => self.inner.wait(wait_set, timeout),
        }
    }

    fn wake_listener(&self) -> Option<Arc<dyn WakeListener>> {
        self.inner.wake_listener()
    }
}

/// Poll `condition` every millisecond until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
