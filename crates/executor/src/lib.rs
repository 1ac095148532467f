//! Priority-aware callback executor for real-time node graphs.
//!
//! Nodes own callback groups, groups own event sources (timers,
//! subscriptions, services, clients, waitables). An executor repeatedly
//! collects the sources of every open group, blocks until some are ready,
//! selects one and runs it:
//!
//! - **Selection**: strict kind precedence (timers first) by default, or the
//!   largest source priority when priority mode is on.
//! - **Mutual exclusion**: a mutually exclusive group is closed from
//!   selection until completion of any member, across all workers.
//! - **Timer de-duplication**: in the multi-threaded executor a timer is
//!   checked out to one worker at a time.
//! - **Bounded check-in latency**: workers poll under the low-priority side
//!   of a [`TwoPriorityMutex`] and check timers back in under the high side.
//! - **Real-time workers**: each worker pins itself to a core and switches
//!   to fixed-priority scheduling; failures are logged, never fatal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::time::Duration;
//!
//! use prioexec_errors::{CallbackError, TakeError};
//! use prioexec_executor::{ExecutorOptions, Node, Payload, SingleThreadExecutor, SourceHandle, SourceKind};
//!
//! struct OneShot(AtomicBool);
//!
//! impl SourceHandle for OneShot {
//!     fn is_ready(&self) -> bool {
//!         self.0.load(Ordering::SeqCst)
//!     }
//!
//!     fn take(&self) -> Result<Option<Payload>, TakeError> {
//!         Ok(self.0.swap(false, Ordering::SeqCst).then(|| Box::new(()) as Payload))
//!     }
//!
//!     fn execute(&self, _payload: &mut Payload) -> Result<(), CallbackError> {
//!         Ok(())
//!     }
//! }
//!
//! let executor = SingleThreadExecutor::new(ExecutorOptions::default())?;
//! let node = Node::new("demo");
//! node.add_source(SourceKind::Timer, 0, Arc::new(OneShot(AtomicBool::new(true))));
//! executor.add_node(&node)?;
//!
//! assert!(executor.spin_once(Duration::from_millis(10))?);
//! assert_eq!(executor.counters().timers, 1);
//! # Ok::<(), prioexec_errors::ExecutorError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used, missing_debug_implementations)]

pub mod collector;
pub mod condvar_wait;
pub mod entities;
pub mod gate;
pub mod multi_thread;
pub mod options;
pub mod prelude;
pub mod scheduled_timers;
pub mod selection;
pub mod single_thread;
pub mod two_priority_mutex;
pub mod wait_set;

mod dispatcher;
mod execution;

#[cfg(test)]
mod test_support;

pub use collector::{ReadinessCollector, WaitOutcome};
pub use condvar_wait::CondvarWait;
pub use entities::{
    CallbackGroup, EventSource, Exclusivity, GroupId, Node, NodeId, Payload, SourceHandle,
    SourceId, SourceKind, WakeCondition, WakeListener,
};
pub use gate::CallbackGroupGate;
pub use multi_thread::MultiThreadExecutor;
pub use options::{DEFAULT_POLL_TIMEOUT, ExecutorOptions};
pub use scheduled_timers::ScheduledTimerSet;
pub use selection::{
    Executable, KindPrecedence, PriorityOrder, PriorityScheduler, SelectedUnit, SelectionMode,
    SelectionStrategy, select_with,
};
pub use single_thread::SingleThreadExecutor;
pub use two_priority_mutex::{LockPriority, PriorityGuard, TwoPriorityMutex};
pub use wait_set::{WaitPrimitive, WaitSet, WaitSetSizes, WaitStatus};
