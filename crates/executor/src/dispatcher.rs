//! State shared by every worker of one executor.
//!
//! The [`Dispatcher`] owns the running flag, the readiness collector behind
//! a plain mutex, the scheduler, the counters and the optional trace sink.
//! Both executors drive their cycles through it: `wait_and_select`, then
//! execution, then `complete`.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use prioexec_atomic::{DispatchCounters, RuntimeTracker};
use prioexec_errors::{ExecutorError, ProtocolError};
use prioexec_tracing::{DispatchTraceEvent, LifecycleEvent, TracingManager};
use tracing::{debug, info, trace};

use crate::collector::{ReadinessCollector, WaitOutcome};
use crate::entities::{Node, WakeCondition};
use crate::options::ExecutorOptions;
use crate::selection::{PriorityScheduler, SelectedUnit, SelectionMode};
use crate::wait_set::WaitPrimitive;

/// Clears the running flag when the spin that set it ends.
pub(crate) struct SpinGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

pub(crate) struct Dispatcher {
    name: String,
    running: AtomicBool,
    interrupt: Arc<WakeCondition>,
    collector: Mutex<ReadinessCollector>,
    scheduler: PriorityScheduler,
    counters: DispatchCounters,
    runtime: RuntimeTracker,
    tracer: Option<TracingManager>,
    epoch: Instant,
}

impl Dispatcher {
    pub(crate) fn new(options: &ExecutorOptions, wait: Box<dyn WaitPrimitive>) -> Self {
        let interrupt = Arc::new(WakeCondition::new());
        let collector = ReadinessCollector::new(wait, Arc::clone(&interrupt));
        Self {
            name: options.name.clone(),
            running: AtomicBool::new(false),
            interrupt,
            collector: Mutex::new(collector),
            scheduler: PriorityScheduler::new(SelectionMode::from_use_priorities(
                options.use_priorities,
            )),
            counters: DispatchCounters::new(),
            runtime: RuntimeTracker::new(),
            tracer: None,
            epoch: Instant::now(),
        }
    }

    pub(crate) fn set_tracer(&mut self, tracer: TracingManager) {
        self.tracer = Some(tracer);
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Set the running flag.
    ///
    /// Fails without touching any state if a spin is already in progress.
    pub(crate) fn begin_spin(&self) -> Result<SpinGuard<'_>, ProtocolError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ProtocolError::AlreadySpinning);
        }
        Ok(SpinGuard {
            running: &self.running,
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn request_shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.interrupt.trigger();
    }

    /// Wake whichever worker is blocked in the readiness wait.
    pub(crate) fn interrupt(&self) {
        self.interrupt.trigger();
    }

    pub(crate) fn add_node(&self, node: &Arc<Node>) -> Result<(), ExecutorError> {
        self.interrupt.trigger();
        self.collector.lock().add_node(node)?;
        self.interrupt.trigger();
        info!(executor = %self.name, node = %node.name(), node_id = %node.id(), "Node added");
        self.lifecycle(&LifecycleEvent::NodeAdded {
            node_id: node.id().get(),
        });
        Ok(())
    }

    pub(crate) fn remove_node(&self, node: &Arc<Node>) -> Result<(), ExecutorError> {
        self.interrupt.trigger();
        self.collector.lock().remove_node(node)?;
        self.interrupt.trigger();
        info!(executor = %self.name, node = %node.name(), node_id = %node.id(), "Node removed");
        self.lifecycle(&LifecycleEvent::NodeRemoved {
            node_id: node.id().get(),
        });
        Ok(())
    }

    /// Run one collect-wait-select cycle.
    ///
    /// Returns the cycle number and the selected unit, whose gate (if any)
    /// is closed. `Ok(None)` means nothing was selected this cycle.
    pub(crate) fn wait_and_select(
        &self,
        timeout: Duration,
    ) -> Result<Option<(u64, SelectedUnit)>, ExecutorError> {
        let mut collector = self.collector.lock();
        let cycle = self.counters.inc_cycle();
        self.trace_event(|timestamp_ns| DispatchTraceEvent::CycleStart {
            cycle,
            timestamp_ns,
        });

        collector.prune_and_collect();
        collector.rebuild_wait_set()?;

        let outcome = match collector.block_until_ready_or_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.trace_event(|timestamp_ns| DispatchTraceEvent::WaitFault {
                    cycle,
                    status: "error",
                    timestamp_ns,
                });
                return Err(e.into());
            }
        };
        match outcome {
            WaitOutcome::Ready => {}
            WaitOutcome::Timeout => {
                self.counters.inc_timeout();
                return Ok(None);
            }
            WaitOutcome::Empty => {
                self.counters.inc_empty_wait_set();
                self.trace_event(|timestamp_ns| DispatchTraceEvent::WaitFault {
                    cycle,
                    status: "empty",
                    timestamp_ns,
                });
                return Ok(None);
            }
        }

        collector.discard_null_handles();
        let Some(unit) = self.scheduler.select(collector.ready_mut())? else {
            return Ok(None);
        };
        drop(collector);

        trace!(cycle, source_id = %unit.id(), kind = %unit.kind(), "Selected unit");
        self.trace_event(|timestamp_ns| DispatchTraceEvent::UnitSelected {
            cycle,
            source_id: unit.id().get(),
            kind: unit.kind().as_str(),
            timestamp_ns,
        });
        Ok(Some((cycle, unit)))
    }

    /// Reopen the unit's gate. Returns whether this call reopened it.
    pub(crate) fn complete(&self, unit: &mut SelectedUnit) -> bool {
        let released = unit.release_gate();
        if released {
            debug!(group = %unit.group().id(), source_id = %unit.id(), "Callback group gate reopened");
        }
        released
    }

    pub(crate) fn scheduler(&self) -> &PriorityScheduler {
        &self.scheduler
    }

    pub(crate) fn counters(&self) -> &DispatchCounters {
        &self.counters
    }

    pub(crate) fn runtime(&self) -> &RuntimeTracker {
        &self.runtime
    }

    pub(crate) fn tracer(&self) -> Option<&TracingManager> {
        self.tracer.as_ref()
    }

    pub(crate) fn trace_event(&self, event: impl FnOnce(u64) -> DispatchTraceEvent) {
        if let Some(tracer) = &self.tracer {
            tracer.emit_dispatch_event(event(self.timestamp_ns()));
        }
    }

    pub(crate) fn lifecycle(&self, event: &LifecycleEvent) {
        if let Some(tracer) = &self.tracer {
            tracer.emit_lifecycle_event(event);
        }
    }

    fn timestamp_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("mode", &self.scheduler.mode())
            .field("tracing", &self.tracer.is_some())
            .finish_non_exhaustive()
    }
}
