//! Executor dispatching from a pool of real-time worker threads.
//!
//! `spin()` runs `N - 1` scoped worker threads plus the calling thread as
//! worker 0. Each worker loops over
//!
//! 1. the low-priority side of the [`TwoPriorityMutex`]: re-check the
//!    running flag, collect, wait, select, and check a selected timer into
//!    the [`ScheduledTimerSet`] (backing off if another worker owns it),
//! 2. an optional yield,
//! 3. execution outside any lock,
//! 4. the high-priority side: check the timer back out,
//! 5. reopening the group gate and waking the next waiter.
//!
//! Only one worker waits for readiness at a time. Check-outs queue at the
//! high-priority side, so they never wait behind another worker's poll.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prioexec_atomic::CounterSnapshot;
use prioexec_errors::{ConfigError, ExecutorError, ProtocolError, Result};
use prioexec_rt::WorkerRtSetup;
use prioexec_tracing::{DispatchTraceEvent, LifecycleEvent, TracingManager};
use tracing::{debug, error, info, trace, warn};

use crate::condvar_wait::CondvarWait;
use crate::dispatcher::Dispatcher;
use crate::entities::Node;
use crate::execution::{execute_unit, panic_message};
use crate::options::ExecutorOptions;
use crate::scheduled_timers::ScheduledTimerSet;
use crate::selection::{SelectedUnit, SelectionMode};
use crate::two_priority_mutex::TwoPriorityMutex;
use crate::wait_set::WaitPrimitive;

/// Multi-threaded dispatcher with timer de-duplication.
///
/// # Example
///
/// ```rust,no_run
/// use prioexec_executor::{ExecutorOptions, MultiThreadExecutor};
/// use prioexec_rt::WorkerRtSetup;
///
/// let options = ExecutorOptions::default()
///     .with_thread_count(4)
///     .with_rt_setup(WorkerRtSetup::minimal());
/// let executor = MultiThreadExecutor::new(options)?;
/// assert_eq!(executor.thread_count(), 4);
/// # Ok::<(), prioexec_errors::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct MultiThreadExecutor {
    dispatcher: Dispatcher,
    scheduled: TwoPriorityMutex<ScheduledTimerSet>,
    thread_count: usize,
    yield_before_execute: bool,
    poll_timeout: Duration,
    rt_setup: WorkerRtSetup,
}

impl MultiThreadExecutor {
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
            scheduled: TwoPriorityMutex::new(ScheduledTimerSet::new()),
            thread_count: options.resolved_thread_count(),
            yield_before_execute: options.yield_before_execute,
            poll_timeout: options.poll_timeout,
            rt_setup: options.rt_setup,
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

    /// Number of workers `spin()` runs, the calling thread included.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Dispatch on all workers until shutdown or a fatal error.
    ///
    /// Returns once every worker has been joined. The first worker to fail
    /// requests shutdown for the rest.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::AlreadySpinning`] if another spin is in progress;
    ///   no thread is started
    /// - the first worker error (wait set failure, failing callback)
    /// - [`ExecutorError::Worker`] if a worker could not be spawned or
    ///   panicked
    /// - [`ProtocolError::StuckTimer`] if a timer was left checked out
    pub fn spin(&self) -> Result<()> {
        let _spinning = self.dispatcher.begin_spin()?;
        let name = self.dispatcher.name();
        info!(executor = %name, threads = self.thread_count, "Multi-threaded executor spinning");
        self.dispatcher.lifecycle(&LifecycleEvent::Started {
            name: name.to_owned(),
            threads: self.thread_count,
        });

        let result = thread::scope(|scope| {
            let mut workers = Vec::with_capacity(self.thread_count.saturating_sub(1));
            for worker in 1..self.thread_count {
                let spawned = thread::Builder::new()
                    .name(format!("{name}-worker-{worker}"))
                    .spawn_scoped(scope, move || self.run_worker(worker));
                match spawned {
                    Ok(handle) => workers.push((worker, handle)),
                    Err(e) => {
                        error!(executor = %name, worker = worker, error = %e, "Failed to spawn worker");
                        self.dispatcher.request_shutdown();
                        return Err(ExecutorError::worker(format!(
                            "failed to spawn worker {worker}: {e}"
                        )));
                    }
                }
            }

            let mut result = self.run_worker(0);
            for (worker, handle) in workers {
                let joined = handle.join().unwrap_or_else(|_| {
                    error!(executor = %name, worker = worker, "Worker panicked");
                    Err(ExecutorError::worker(format!("worker {worker} panicked")))
                });
                if let Err(e) = joined {
                    if result.is_ok() {
                        result = Err(e);
                    } else {
                        debug!(worker = worker, error = %e, "Further worker error");
                    }
                }
            }
            result
        });

        let stuck = self.scheduled.lock_high().first();
        let result = match (result, stuck) {
            (Ok(()), Some(timer)) => Err(ProtocolError::StuckTimer { timer: timer.get() }.into()),
            (Err(e), Some(timer)) => {
                error!(executor = %name, timer = %timer, "Timer left checked out after failure");
                Err(e)
            }
            (result, None) => result,
        };

        let cycles = self.dispatcher.counters().cycles();
        info!(executor = %name, cycles = cycles, "Multi-threaded executor stopped");
        self.dispatcher.lifecycle(&LifecycleEvent::Stopped {
            name: name.to_owned(),
            cycles,
        });
        result
    }

    fn run_worker(&self, worker: usize) -> Result<()> {
        let report = self.rt_setup.apply(worker);
        for failure in report.failures() {
            warn!(worker = worker, error = %failure, "Worker running without part of its real-time setup");
            self.dispatcher.lifecycle(&LifecycleEvent::WorkerRtDegraded {
                worker,
                reason: failure.to_string(),
            });
        }
        debug!(worker = worker, "Worker started");
        self.dispatcher.lifecycle(&LifecycleEvent::WorkerStarted {
            worker,
            core_id: worker,
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.worker_loop()))
            .unwrap_or_else(|panicked| {
                Err(ExecutorError::worker(format!(
                    "worker {worker} panicked: {}",
                    panic_message(&*panicked)
                )))
            });
        if let Err(e) = &result {
            error!(worker = worker, error = %e, "Worker stopped on error");
            self.dispatcher.request_shutdown();
        }
        debug!(worker = worker, "Worker exiting");
        result
    }

    fn worker_loop(&self) -> Result<()> {
        while self.dispatcher.is_running() {
            let Some((cycle, unit)) = self.next_unit()? else {
                continue;
            };
            if self.yield_before_execute {
                thread::yield_now();
            }
            self.finish(cycle, unit)?;
        }
        Ok(())
    }

    /// The low-priority critical section of one worker cycle.
    ///
    /// Returns `None` on shutdown, on an idle cycle, or when the selected
    /// timer is already checked out to another worker.
    pub(crate) fn next_unit(&self) -> Result<Option<(u64, SelectedUnit)>> {
        let mut scheduled = self.scheduled.lock_low();
        if !self.dispatcher.is_running() {
            return Ok(None);
        }
        let Some((cycle, mut unit)) = self.dispatcher.wait_and_select(self.poll_timeout)? else {
            return Ok(None);
        };
        if let Some(timer) = unit.timer_id() {
            if !scheduled.try_insert(timer) {
                unit.release_gate();
                self.dispatcher.counters().inc_dedup_rejection();
                trace!(cycle, timer = %timer, "Timer already in flight on another worker");
                self.dispatcher.trace_event(|timestamp_ns| DispatchTraceEvent::DedupRejected {
                    cycle,
                    timer_id: timer.get(),
                    timestamp_ns,
                });
                return Ok(None);
            }
        }
        Ok(Some((cycle, unit)))
    }

    /// Execute a unit from [`next_unit`](Self::next_unit) and complete it.
    ///
    /// Bookkeeping runs even when the callback fails or unwinds.
    pub(crate) fn finish(&self, cycle: u64, unit: SelectedUnit) -> Result<()> {
        let checkout = Checkout {
            executor: self,
            unit,
        };
        let outcome = execute_unit(&self.dispatcher, cycle, &checkout.unit);
        drop(checkout);
        outcome.map(|_| ())
    }

    /// Stop all workers. Each exits within one poll timeout.
    pub fn request_shutdown(&self) {
        self.dispatcher.request_shutdown();
    }

    /// True while `spin()` is in progress.
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

    /// Longest callback execution observed so far, across all workers.
    pub fn max_observed_runtime(&self) -> Duration {
        self.dispatcher.runtime().max()
    }

    /// Dispatch counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.dispatcher.counters().snapshot()
    }

    /// Number of timers currently checked out.
    pub fn timers_in_flight(&self) -> usize {
        self.scheduled.lock_high().len()
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

/// Checks a unit's timer out and reopens its gate when dropped.
struct Checkout<'a> {
    executor: &'a MultiThreadExecutor,
    unit: SelectedUnit,
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if let Some(timer) = self.unit.timer_id() {
            self.executor.scheduled.lock_high().remove(timer);
        }
        if self.executor.dispatcher.complete(&mut self.unit) {
            self.executor.dispatcher.interrupt();
        }
    }
}
