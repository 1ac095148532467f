//! Shared test utilities for prioexec.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`wait`] - [`ScriptedWait`], a wait primitive with canned statuses
//! - [`source`] - [`RecordingSource`] and the shared log and probe it reports to
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! prioexec-test-helpers = { path = "crates/prioexec-test-helpers" }
//! ```
//!
//! ```rust,ignore
//! use prioexec_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic, clippy::panic_in_result_fn)]

pub mod must;
pub mod prelude;
pub mod source;
pub mod wait;

pub use must::*;
pub use source::{ConcurrencyProbe, ExecutionLog, ProbeGuard, RecordingSource};
pub use wait::{ScriptedWait, WaitScript, wait_until};
