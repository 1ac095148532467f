//! Errors raised by event sources and the callbacks they run.

/// A source flagged ready failed to yield its data.
///
/// Recoverable: the executor logs it, skips the source for this cycle and
/// keeps spinning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TakeError {
    /// Taking the pending data failed
    #[error("take failed: {0}")]
    Failed(String),

    /// Returning a loaned or serialized buffer failed
    #[error("returning the taken buffer failed: {0}")]
    Release(String),
}

impl TakeError {
    /// Create a take failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        TakeError::Failed(reason.into())
    }

    /// Create a release failure.
    pub fn release(reason: impl Into<String>) -> Self {
        TakeError::Release(reason.into())
    }
}

/// A user callback failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("callback failed: {reason}")]
pub struct CallbackError {
    /// Failure description
    pub reason: String,
}

impl CallbackError {
    /// Create a callback failure.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
