//! Wait set errors.
//!
//! A run loop cannot make progress without a valid wait set, so every
//! variant here terminates `spin()`.

use crate::common::ErrorSeverity;

/// Wait set construction or wait failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitSetError {
    /// Clearing the previous cycle's entries failed
    #[error("couldn't clear wait set: {0}")]
    Clear(String),

    /// Resizing to the collected counts failed
    #[error("couldn't resize the wait set to {requested} entries: {reason}")]
    Resize {
        /// Total number of entries requested
        requested: usize,
        /// Reason reported by the allocator or the wait primitive
        reason: String,
    },

    /// A handle did not fit in the slots sized for its kind
    #[error("couldn't fill wait set: no free {kind} slot")]
    Populate {
        /// Source kind that overflowed
        kind: &'static str,
    },

    /// The blocking wait itself reported a failure
    #[error("wait failed: {0}")]
    Wait(String),
}

impl WaitSetError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }

    /// Create a resize error.
    pub fn resize(requested: usize, reason: impl Into<String>) -> Self {
        WaitSetError::Resize {
            requested,
            reason: reason.into(),
        }
    }

    /// Create a wait error.
    pub fn wait(reason: impl Into<String>) -> Self {
        WaitSetError::Wait(reason.into())
    }
}
