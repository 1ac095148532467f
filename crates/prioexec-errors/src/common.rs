//! Top-level error type and classification shared by every executor crate.

use core::fmt;

use crate::{CallbackError, ConfigError, ProtocolError, TakeError, WaitSetError};

/// Top-level error type returned by the run loops.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Caller or bookkeeping bug
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// Wait set construction or wait failure
    #[error("Wait set error: {0}")]
    WaitSet(#[from] WaitSetError),

    /// A ready source failed to yield data
    #[error("Take failed on source {source_id}: {error}")]
    Take {
        /// Identity of the source
        source_id: u64,
        /// Underlying failure
        #[source]
        error: TakeError,
    },

    /// A user callback failed
    #[error("Callback failed on source {source_id}: {error}")]
    Callback {
        /// Identity of the source
        source_id: u64,
        /// Underlying failure
        #[source]
        error: CallbackError,
    },

    /// Rejected executor options
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A worker thread could not be spawned or panicked
    #[error("Worker error: {0}")]
    Worker(String),
}

impl ExecutorError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExecutorError::Protocol(_) => ErrorCategory::Protocol,
            ExecutorError::WaitSet(_) => ErrorCategory::WaitSet,
            ExecutorError::Take { .. } => ErrorCategory::Source,
            ExecutorError::Callback { .. } => ErrorCategory::Callback,
            ExecutorError::Config(_) => ErrorCategory::Config,
            ExecutorError::Worker(_) => ErrorCategory::Worker,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExecutorError::Protocol(_) => ErrorSeverity::Critical,
            ExecutorError::WaitSet(e) => e.severity(),
            ExecutorError::Take { .. } => ErrorSeverity::Warning,
            ExecutorError::Callback { .. } => ErrorSeverity::Error,
            ExecutorError::Config(_) => ErrorSeverity::Error,
            ExecutorError::Worker(_) => ErrorSeverity::Critical,
        }
    }

    /// Check if the run loop may continue after this error.
    ///
    /// Only take failures are recoverable: the source is skipped for the
    /// current cycle and picked up again once it reports readiness.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Error
    }

    /// Create a worker error with a message.
    pub fn worker(msg: impl Into<String>) -> Self {
        ExecutorError::Worker(msg.into())
    }

    /// Wrap a take failure for the given source.
    pub fn take(source_id: u64, error: TakeError) -> Self {
        ExecutorError::Take { source_id, error }
    }

    /// Wrap a callback failure for the given source.
    pub fn callback(source_id: u64, error: CallbackError) -> Self {
        ExecutorError::Callback { source_id, error }
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Protocol violations
    Protocol = 0,
    /// Wait set errors
    WaitSet = 1,
    /// Source take errors
    Source = 2,
    /// User callback errors
    Callback = 3,
    /// Configuration errors
    Config = 4,
    /// Worker thread errors
    Worker = 5,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::WaitSet => write!(f, "WaitSet"),
            ErrorCategory::Source => write!(f, "Source"),
            ErrorCategory::Callback => write!(f, "Callback"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Worker => write!(f, "Worker"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, the cycle is skipped
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the run loop cannot make progress
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
