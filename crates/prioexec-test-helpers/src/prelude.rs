//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use prioexec_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_some, must_with};
pub use crate::source::{ConcurrencyProbe, ExecutionLog, RecordingSource};
pub use crate::wait::{ScriptedWait, WaitScript, wait_until};
