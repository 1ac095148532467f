//! Trace event definitions for dispatch cycles and executor lifecycle

use core::fmt;
use std::io::{Cursor, Write};

/// Size of the stack buffer a marker line is formatted into.
///
/// Large enough for the longest event with every numeric field at `u64::MAX`.
pub const MARKER_LINE_LEN: usize = 192;

/// Dispatch trace events emitted from worker threads
///
/// # RT-Safety
///
/// All variants are `Copy` and carry only integers and static strings, so
/// emission never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTraceEvent {
    /// A worker started a wait-select cycle
    CycleStart {
        /// Executor-wide cycle counter
        cycle: u64,
        /// Timestamp in nanoseconds (monotonic clock)
        timestamp_ns: u64,
    },

    /// A ready unit was selected and its group gate closed
    UnitSelected {
        /// Executor-wide cycle counter
        cycle: u64,
        /// Identity of the selected source
        source_id: u64,
        /// Source kind name (`timer`, `subscription`, ...)
        kind: &'static str,
        /// Timestamp in nanoseconds (monotonic clock)
        timestamp_ns: u64,
    },

    /// A timer was rejected because another worker already owns it
    DedupRejected {
        /// Executor-wide cycle counter
        cycle: u64,
        /// Identity of the rejected timer
        timer_id: u64,
        /// Timestamp in nanoseconds (monotonic clock)
        timestamp_ns: u64,
    },

    /// A unit finished executing
    ExecuteEnd {
        /// Executor-wide cycle counter
        cycle: u64,
        /// Identity of the executed source
        source_id: u64,
        /// Callback runtime in nanoseconds
        runtime_ns: u64,
        /// Timestamp in nanoseconds (monotonic clock)
        timestamp_ns: u64,
    },

    /// The wait primitive returned something other than ready or timeout
    WaitFault {
        /// Executor-wide cycle counter
        cycle: u64,
        /// `empty` or `error`
        status: &'static str,
        /// Timestamp in nanoseconds (monotonic clock)
        timestamp_ns: u64,
    },
}

/// Categories of dispatch trace events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchEventCategory {
    /// Cycle boundaries and execution timing
    Timing,
    /// Selection decisions
    Selection,
    /// Anomalies in the wait path
    Fault,
}

impl DispatchTraceEvent {
    /// Returns the event type name as a static string
    pub const fn event_type(&self) -> &'static str {
        match self {
            DispatchTraceEvent::CycleStart { .. } => "cycle_start",
            DispatchTraceEvent::UnitSelected { .. } => "unit_selected",
            DispatchTraceEvent::DedupRejected { .. } => "dedup_rejected",
            DispatchTraceEvent::ExecuteEnd { .. } => "execute_end",
            DispatchTraceEvent::WaitFault { .. } => "wait_fault",
        }
    }

    /// Returns the event category for filtering
    pub const fn category(&self) -> DispatchEventCategory {
        match self {
            DispatchTraceEvent::CycleStart { .. } | DispatchTraceEvent::ExecuteEnd { .. } => {
                DispatchEventCategory::Timing
            }
            DispatchTraceEvent::UnitSelected { .. } | DispatchTraceEvent::DedupRejected { .. } => {
                DispatchEventCategory::Selection
            }
            DispatchTraceEvent::WaitFault { .. } => DispatchEventCategory::Fault,
        }
    }

    /// Returns the cycle this event belongs to
    pub const fn cycle(&self) -> u64 {
        match self {
            DispatchTraceEvent::CycleStart { cycle, .. }
            | DispatchTraceEvent::UnitSelected { cycle, .. }
            | DispatchTraceEvent::DedupRejected { cycle, .. }
            | DispatchTraceEvent::ExecuteEnd { cycle, .. }
            | DispatchTraceEvent::WaitFault { cycle, .. } => *cycle,
        }
    }

    /// Returns the event timestamp in nanoseconds
    pub const fn timestamp_ns(&self) -> u64 {
        match self {
            DispatchTraceEvent::CycleStart { timestamp_ns, .. }
            | DispatchTraceEvent::UnitSelected { timestamp_ns, .. }
            | DispatchTraceEvent::DedupRejected { timestamp_ns, .. }
            | DispatchTraceEvent::ExecuteEnd { timestamp_ns, .. }
            | DispatchTraceEvent::WaitFault { timestamp_ns, .. } => *timestamp_ns,
        }
    }

    /// Returns true for fault events
    pub const fn is_fault(&self) -> bool {
        matches!(self.category(), DispatchEventCategory::Fault)
    }

    /// Format the event as a `trace_marker` line into `buf` without allocating.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` is too small; a [`MARKER_LINE_LEN`] buffer
    /// always suffices.
    pub fn write_marker(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut cursor = Cursor::new(buf);
        write!(cursor, "prioexec_{} {}", self.event_type(), MarkerFields(self))?;
        Ok(usize::try_from(cursor.position()).unwrap_or(0))
    }
}

struct MarkerFields<'a>(&'a DispatchTraceEvent);

impl fmt::Display for MarkerFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            DispatchTraceEvent::CycleStart {
                cycle,
                timestamp_ns,
            } => write!(f, "cycle={cycle} ts={timestamp_ns}"),
            DispatchTraceEvent::UnitSelected {
                cycle,
                source_id,
                kind,
                timestamp_ns,
            } => write!(
                f,
                "cycle={cycle} source={source_id} kind={kind} ts={timestamp_ns}"
            ),
            DispatchTraceEvent::DedupRejected {
                cycle,
                timer_id,
                timestamp_ns,
            } => write!(f, "cycle={cycle} timer={timer_id} ts={timestamp_ns}"),
            DispatchTraceEvent::ExecuteEnd {
                cycle,
                source_id,
                runtime_ns,
                timestamp_ns,
            } => write!(
                f,
                "cycle={cycle} source={source_id} runtime={runtime_ns} ts={timestamp_ns}"
            ),
            DispatchTraceEvent::WaitFault {
                cycle,
                status,
                timestamp_ns,
            } => write!(f, "cycle={cycle} status={status} ts={timestamp_ns}"),
        }
    }
}

impl fmt::Display for DispatchTraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchTraceEvent::CycleStart {
                cycle,
                timestamp_ns,
            } => write!(f, "CycleStart(cycle={cycle}, ts={timestamp_ns}ns)"),
            DispatchTraceEvent::UnitSelected {
                cycle,
                source_id,
                kind,
                timestamp_ns,
            } => write!(
                f,
                "UnitSelected(cycle={cycle}, source={source_id}, kind={kind}, ts={timestamp_ns}ns)"
            ),
            DispatchTraceEvent::DedupRejected {
                cycle,
                timer_id,
                timestamp_ns,
            } => write!(
                f,
                "DedupRejected(cycle={cycle}, timer={timer_id}, ts={timestamp_ns}ns)"
            ),
            DispatchTraceEvent::ExecuteEnd {
                cycle,
                source_id,
                runtime_ns,
                timestamp_ns,
            } => write!(
                f,
                "ExecuteEnd(cycle={cycle}, source={source_id}, runtime={runtime_ns}ns, ts={timestamp_ns}ns)"
            ),
            DispatchTraceEvent::WaitFault {
                cycle,
                status,
                timestamp_ns,
            } => write!(
                f,
                "WaitFault(cycle={cycle}, status={status}, ts={timestamp_ns}ns)"
            ),
        }
    }
}

/// Executor lifecycle events
///
/// Not RT-safe: variants own strings. Emitted when an executor starts or
/// stops, when nodes come and go, and when a worker could not get its
/// requested real-time setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `spin()` entered
    Started {
        /// Executor name
        name: String,
        /// Number of worker threads, caller included
        threads: usize,
    },

    /// `spin()` returned
    Stopped {
        /// Executor name
        name: String,
        /// Cycles run in total
        cycles: u64,
    },

    /// A worker entered its dispatch loop
    WorkerStarted {
        /// Worker index
        worker: usize,
        /// Core the worker asked to be pinned to
        core_id: usize,
    },

    /// A worker is running without part of its real-time setup
    WorkerRtDegraded {
        /// Worker index
        worker: usize,
        /// What failed
        reason: String,
    },

    /// A node was registered
    NodeAdded {
        /// Node identity
        node_id: u64,
    },

    /// A node was deregistered
    NodeRemoved {
        /// Node identity
        node_id: u64,
    },

    /// A user callback failed
    CallbackFailed {
        /// Identity of the source whose callback failed
        source_id: u64,
        /// Failure description
        reason: String,
    },
}

impl LifecycleEvent {
    /// Returns the event type name as a static string
    pub fn event_type(&self) -> &'static str {
        match self {
            LifecycleEvent::Started { .. } => "started",
            LifecycleEvent::Stopped { .. } => "stopped",
            LifecycleEvent::WorkerStarted { .. } => "worker_started",
            LifecycleEvent::WorkerRtDegraded { .. } => "worker_rt_degraded",
            LifecycleEvent::NodeAdded { .. } => "node_added",
            LifecycleEvent::NodeRemoved { .. } => "node_removed",
            LifecycleEvent::CallbackFailed { .. } => "callback_failed",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Started { name, threads } => {
                write!(f, "Started(name={name}, threads={threads})")
            }
            LifecycleEvent::Stopped { name, cycles } => {
                write!(f, "Stopped(name={name}, cycles={cycles})")
            }
            LifecycleEvent::WorkerStarted { worker, core_id } => {
                write!(f, "WorkerStarted(worker={worker}, core={core_id})")
            }
            LifecycleEvent::WorkerRtDegraded { worker, reason } => {
                write!(f, "WorkerRtDegraded(worker={worker}, reason={reason})")
            }
            LifecycleEvent::NodeAdded { node_id } => write!(f, "NodeAdded(id={node_id})"),
            LifecycleEvent::NodeRemoved { node_id } => write!(f, "NodeRemoved(id={node_id})"),
            LifecycleEvent::CallbackFailed { source_id, reason } => {
                write!(f, "CallbackFailed(source={source_id}, reason={reason})")
            }
        }
    }
}
