//! Tracing error types

use core::fmt;

/// Tracing errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Platform not supported for native tracing
    #[error("Platform not supported for native tracing")]
    PlatformNotSupported,

    /// Provider initialization failed
    #[error("Tracing provider initialization failed: {0}")]
    InitializationFailed(String),

    /// Event emission failed
    #[error("Trace event emission failed: {0}")]
    EmissionFailed(String),
}

impl TracingError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            TracingError::PlatformNotSupported => false,
            TracingError::InitializationFailed(_) => false,
            TracingError::EmissionFailed(_) => true,
        }
    }

    /// Create an initialization error with context
    pub fn init_failed(context: impl fmt::Display) -> Self {
        TracingError::InitializationFailed(context.to_string())
    }

    /// Create an emission error with context
    pub fn emit_failed(context: impl fmt::Display) -> Self {
        TracingError::EmissionFailed(context.to_string())
    }
}
