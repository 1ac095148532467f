//! # prioexec-atomic
//!
//! Lock-free counters for the executor's worker threads.
//!
//! Every worker bumps these from inside its dispatch cycle, so all recording
//! methods are a single relaxed atomic operation: no allocation, no locking,
//! no syscalls.
//!
//! - [`counters`] - per-outcome dispatch counters ([`DispatchCounters`])
//! - [`stats`] - execution runtime tracking ([`RuntimeTracker`])
//!
//! ## Usage
//!
//! ```rust
//! use prioexec_atomic::{DispatchCounters, RuntimeTracker};
//! use std::time::Duration;
//!
//! let counters = DispatchCounters::new();
//! counters.inc_cycle();
//! counters.inc_timer_dispatch();
//!
//! let runtime = RuntimeTracker::new();
//! runtime.record(Duration::from_micros(40));
//! runtime.record(Duration::from_micros(15));
//!
//! assert_eq!(counters.snapshot().dispatched(), 1);
//! assert_eq!(runtime.max(), Duration::from_micros(40));
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod counters;
pub mod prelude;
pub mod stats;

pub use counters::{CounterSnapshot, DispatchCounters};
pub use stats::{RuntimeStats, RuntimeTracker};
