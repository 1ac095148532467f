//! Real-time configuration for executor worker threads.
//!
//! Every worker of the multi-threaded executor calls
//! [`WorkerRtSetup::apply`] on itself before entering its dispatch loop:
//!
//! - **CPU pinning**: the worker is bound to one logical core
//! - **Fixed-priority scheduling**: `SCHED_FIFO` on Linux,
//!   `THREAD_PRIORITY_TIME_CRITICAL` on Windows
//! - **Memory locking** (optional): `mlockall` on Linux
//!
//! Failures never abort the worker. Dispatch correctness does not depend on
//! pinning or priority, only latency does, so [`apply`](WorkerRtSetup::apply)
//! returns an [`RtSetupReport`] describing what took effect and leaves the
//! decision of how loudly to complain to the caller.
//!
//! # Example
//!
//! ```no_run
//! use prioexec_rt::WorkerRtSetup;
//!
//! let report = WorkerRtSetup::default().apply(0);
//! if !report.is_complete() {
//!     eprintln!("running without full RT guarantees: {report:?}");
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod error;
pub mod rt_setup;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod fallback;

pub mod prelude;

pub use error::{RTError, RTResult};
pub use rt_setup::{MAX_RT_PRIORITY, MIN_RT_PRIORITY, RtSetupReport, SetupStep, WorkerRtSetup};

/// Default real-time priority: one below the `SCHED_FIFO` maximum.
pub const DEFAULT_RT_PRIORITY: i32 = 98;

/// Number of logical CPUs, floored at 1.
///
/// Worker pinning wraps core ids around this value and executors size their
/// default thread pool from it.
pub fn available_cores() -> usize {
    num_cpus::get().max(1)
}

/// Valid fixed-priority range `(min, max)` on this platform.
pub fn priority_range() -> (i32, i32) {
    platform::priority_range()
}

#[cfg(target_os = "linux")]
pub(crate) use linux as platform;

#[cfg(target_os = "windows")]
pub(crate) use windows as platform;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub(crate) use fallback as platform;
