//! Executor configuration errors.

/// Rejected executor options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The diagnostic name is empty
    #[error("executor name must not be empty")]
    EmptyName,

    /// The poll timeout is zero
    #[error("poll timeout must be greater than zero")]
    ZeroPollTimeout,

    /// The real-time priority is outside the platform range
    #[error("real-time priority {priority} is out of range [{min}, {max}]")]
    InvalidPriority {
        /// Requested priority
        priority: i32,
        /// Minimum allowed priority
        min: i32,
        /// Maximum allowed priority
        max: i32,
    },

    /// The options document could not be parsed
    #[error("invalid options document: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Create a parse error with context.
    pub fn parse(context: impl core::fmt::Display) -> Self {
        ConfigError::Parse(context.to_string())
    }
}
