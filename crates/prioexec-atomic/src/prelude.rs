//! Prelude for prioexec-atomic.
//!
//! ```rust
//! use prioexec_atomic::prelude::*;
//!
//! let counters = DispatchCounters::new();
//! counters.inc_dedup_rejection();
//! assert_eq!(counters.snapshot().dedup_rejections, 1);
//! ```

pub use crate::counters::{CounterSnapshot, DispatchCounters};
pub use crate::stats::{RuntimeStats, RuntimeTracker};
