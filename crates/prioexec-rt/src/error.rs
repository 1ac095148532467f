//! Error types for real-time thread setup.

/// Real-time setup failure for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RTError {
    /// The requested core does not exist or cannot be represented
    #[error("core {core} is out of range (max {max})")]
    InvalidCore {
        /// Requested logical core
        core: usize,
        /// Highest representable core
        max: usize,
    },

    /// The OS refused the affinity change
    #[error("failed to pin thread to core {core} (os error {code})")]
    AffinityFailed {
        /// Requested logical core
        core: usize,
        /// OS error code
        code: i32,
    },

    /// The OS refused the scheduling class change (usually missing CAP_SYS_NICE)
    #[error("failed to set real-time priority {priority} (os error {code})")]
    SchedulingFailed {
        /// Requested priority
        priority: i32,
        /// OS error code
        code: i32,
    },

    /// Locking process memory failed
    #[error("failed to lock memory (os error {code})")]
    MemoryLockFailed {
        /// OS error code
        code: i32,
    },

    /// The platform offers no such control
    #[error("not supported on this platform")]
    Unsupported,
}

/// Result type for real-time setup steps.
pub type RTResult<T = ()> = Result<T, RTError>;
