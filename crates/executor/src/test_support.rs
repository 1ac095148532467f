//! Source handles and wait primitives shared by the unit tests.

#![allow(clippy::panic, clippy::panic_in_result_fn)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use prioexec_errors::{CallbackError, TakeError};

use crate::entities::{Payload, SourceHandle, SourceId};
use crate::wait_set::{WaitPrimitive, WaitSet, WaitStatus};

/// Never ready.
pub struct Inert;

impl SourceHandle for Inert {
    fn is_ready(&self) -> bool {
        false
    }

    fn take(&self) -> Result<Option<Payload>, TakeError> {
        Ok(None)
    }

    fn execute(&self, _payload: &mut Payload) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Ready while its flag is set; each execution clears it and is counted.
pub struct Flag {
    ready: AtomicBool,
    executions: AtomicUsize,
    fail: AtomicBool,
    panic: bool,
    log: Option<Arc<Mutex<Vec<SourceId>>>>,
    id: Mutex<Option<SourceId>>,
}

impl Flag {
    pub fn new(ready: bool) -> Self {
        Self {
            ready: AtomicBool::new(ready),
            executions: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            panic: false,
            log: None,
            id: Mutex::new(None),
        }
    }

    /// Flag that appends its source identity to `log` on every execution.
    pub fn logged(ready: bool, log: Arc<Mutex<Vec<SourceId>>>) -> Self {
        Self {
            log: Some(log),
            ..Self::new(ready)
        }
    }

    pub fn set(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn bind(&self, id: SourceId) {
        *self.id.lock() = Some(id);
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl SourceHandle for Flag {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn take(&self) -> Result<Option<Payload>, TakeError> {
        if self.ready.swap(false, Ordering::SeqCst) {
            Ok(Some(Box::new(())))
        } else {
            Ok(None)
        }
    }

    fn execute(&self, _payload: &mut Payload) -> Result<(), CallbackError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let (Some(log), Some(id)) = (self.log.as_ref(), *self.id.lock()) {
            log.lock().push(id);
        }
        if self.panic {
            panic!("flag panic");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CallbackError::new("flag callback failed"));
        }
        Ok(())
    }
}

/// Ready once, then every take fails.
pub struct BrokenTake {
    ready: AtomicBool,
}

impl BrokenTake {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
        }
    }
}

impl SourceHandle for BrokenTake {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn take(&self) -> Result<Option<Payload>, TakeError> {
        self.ready.store(false, Ordering::SeqCst);
        Err(TakeError::failed("transport gone"))
    }

    fn execute(&self, _payload: &mut Payload) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Non-blocking wait: ready if anything is ready now, otherwise sleeps out
/// the timeout.
#[derive(Default)]
pub struct ImmediateWait {
    failure: Option<String>,
}

impl ImmediateWait {
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_owned()),
        }
    }
}

impl WaitPrimitive for ImmediateWait {
    fn wait(&mut self, wait_set: &mut WaitSet, timeout: Duration) -> WaitStatus {
        if let Some(reason) = &self.failure {
            return WaitStatus::Error(reason.clone());
        }
        if wait_set.is_empty() {
            return WaitStatus::Empty;
        }
        if wait_set.retain_ready(|source| source.handle().is_ready()) {
            return WaitStatus::Ready;
        }
        thread::sleep(timeout);
        if wait_set.retain_ready(|source| source.handle().is_ready()) {
            WaitStatus::Ready
        } else {
            WaitStatus::Timeout
        }
    }
}

/// Always ready; every take panics.
pub struct PanicOnTake;

impl SourceHandle for PanicOnTake {
    fn is_ready(&self) -> bool {
        true
    }

    fn take(&self) -> Result<Option<Payload>, TakeError> {
        panic!("take panicked");
    }

    fn execute(&self, _payload: &mut Payload) -> Result<(), CallbackError> {
        Ok(())
    }
}
