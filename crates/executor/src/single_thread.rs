//! Executor running every callback on the thread that calls `spin()`.

use std::sync::Arc;
use std::time::Duration;

use prioexec_atomic::CounterSnapshot;
use prioexec_errors::{ConfigError, Result};
use prioexec_tracing::{LifecycleEvent, TracingManager};
use tracing::{error, info};

use crate::condvar_wait::CondvarWait;
use crate::dispatcher::Dispatcher;
use crate::entities::Node;
use crate::execution::execute_unit;
use crate::options::ExecutorOptions;
use crate::selection::{SelectedUnit, SelectionMode};
use crate::wait_set::WaitPrimitive;

/// Single-threaded dispatcher.
///
/// Each cycle waits for readiness, selects at most one unit, executes it and
/// reopens its group's gate before the next cycle starts.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use prioexec_executor::{ExecutorOptions, Node, SingleThreadExecutor};
///
/// let executor = Arc::new(SingleThreadExecutor::new(ExecutorOptions::default())?);
/// let node = Node::new("talker");
/// executor.add_node(&node)?;
///
/// let stopper = Arc::clone(&executor);
/// std::thread::spawn(move || {
///     std::thread::sleep(std::time::Duration::from_millis(100));
///     stopper.request_shutdown();
/// });
/// executor.spin()?;
/// # Ok::<(), prioexec_errors::ExecutorError>(())
/// ```
#[derive(Debug)]
pub struct SingleThreadExecutor {
    dispatcher: Dispatcher,
    poll_timeout: Duration,
}

impl SingleThreadExecutor {
    /// Create an executor waiting on a [`CondvarWait`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid option.
    pub fn new(options: ExecutorOptions) -> std::result::Result<Self, ConfigError> {
        Self::with_wait_primitive(options, Box::new(CondvarWait::new()))
    }

    /// Create an executor blocking on a caller-supplied wait primitive.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option.
    pub fn with_wait_primitive(
        options: ExecutorOptions,
        wait: Box<dyn WaitPrimitive>,
    ) -> std::result::Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            dispatcher: Dispatcher::new(&options, wait),
            poll_timeout: options.poll_timeout,
        })
    }

    /// Emit dispatch and lifecycle trace events through `manager`.
    pub fn with_tracing(mut self, manager: TracingManager) -> Self {
        self.dispatcher.set_tracer(manager);
        self
    }

    /// Register a node.
    ///
    /// # Errors
    ///
    /// Fails if the node is already registered with an executor.
    pub fn add_node(&self, node: &Arc<Node>) -> Result<()> {
        self.dispatcher.add_node(node)
    }

    /// Deregister a node.
    ///
    /// # Errors
    ///
    /// Fails if the node is not registered here.
    pub fn remove_node(&self, node: &Arc<Node>) -> Result<()> {
        self.dispatcher.remove_node(node)
    }

    /// Dispatch until [`request_shutdown`](Self::request_shutdown) or a
    /// fatal error.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::AlreadySpinning`] if another spin is in progress
    /// - wait set failures
    /// - the first failing callback, after its bookkeeping completed
    ///
    /// [`ProtocolError::AlreadySpinning`]: prioexec_errors::ProtocolError::AlreadySpinning
    pub fn spin(&self) -> Result<()> {
        let _spinning = self.dispatcher.begin_spin()?;
        let name = self.dispatcher.name();
        info!(executor = %name, "Single-threaded executor spinning");
        self.dispatcher.lifecycle(&LifecycleEvent::Started {
            name: name.to_owned(),
            threads: 1,
        });

        let mut result = Ok(());
        while self.dispatcher.is_running() {
            if let Err(e) = self.run_cycle(self.poll_timeout) {
                error!(executor = %name, error = %e, "Executor stopped on error");
                result = Err(e);
                break;
            }
        }

        let cycles = self.dispatcher.counters().cycles();
        info!(executor = %name, cycles = cycles, "Single-threaded executor stopped");
        self.dispatcher.lifecycle(&LifecycleEvent::Stopped {
            name: name.to_owned(),
            cycles,
        });
        result
    }

    /// Run one wait-select-execute cycle, waiting at most `timeout`.
    ///
    /// Returns whether a callback ran.
    ///
    /// # Errors
    ///
    /// Same as [`spin`](Self::spin).
    pub fn spin_once(&self, timeout: Duration) -> Result<bool> {
        let _spinning = self.dispatcher.begin_spin()?;
        self.run_cycle(timeout)
    }

    fn run_cycle(&self, timeout: Duration) -> Result<bool> {
        let Some((cycle, unit)) = self.dispatcher.wait_and_select(timeout)? else {
            return Ok(false);
        };
        let completion = Completion {
            dispatcher: &self.dispatcher,
            unit,
        };
        let outcome = execute_unit(&self.dispatcher, cycle, &completion.unit);
        drop(completion);
        outcome
    }

    /// Stop spinning. A blocked wait is interrupted.
    pub fn request_shutdown(&self) {
        self.dispatcher.request_shutdown();
    }

    /// True while `spin()` or `spin_once()` is in progress.
    pub fn is_spinning(&self) -> bool {
        self.dispatcher.is_running()
    }

    /// Switch between priority and kind-precedence selection.
    pub fn set_use_priorities(&self, enabled: bool) {
        self.dispatcher.scheduler().set_use_priorities(enabled);
    }

    /// Current selection mode.
    pub fn selection_mode(&self) -> SelectionMode {
        self.dispatcher.scheduler().mode()
    }

    /// Longest callback execution observed so far.
    pub fn max_observed_runtime(&self) -> Duration {
        self.dispatcher.runtime().max()
    }

    /// Dispatch counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.dispatcher.counters().snapshot()
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        self.dispatcher.name()
    }

    /// The attached trace manager, if any.
    pub fn tracing(&self) -> Option<&TracingManager> {
        self.dispatcher.tracer()
    }
}

/// Completes a selected unit when dropped, including during unwinding.
struct Completion<'a> {
    dispatcher: &'a Dispatcher,
    unit: SelectedUnit,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.dispatcher.complete(&mut self.unit);
    }
}
