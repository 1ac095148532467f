//! Tracing provider trait definition

use crate::{DispatchTraceEvent, LifecycleEvent, TracingError, TracingMetrics};

/// Platform-specific tracing provider trait
///
/// # RT-Safety Requirements
///
/// [`emit_dispatch_event`](TracingProvider::emit_dispatch_event) is called
/// from worker threads between selection and execution. It must not
/// allocate, must not block, and must not wait on a contended lock.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: every worker of an executor emits
/// through the same provider.
pub trait TracingProvider: Send + Sync {
    /// Initialize the tracing provider
    ///
    /// Called once before the executor starts spinning. May perform I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be initialized.
    fn initialize(&mut self) -> Result<(), TracingError>;

    /// Emit a dispatch trace event. Must be RT-safe.
    fn emit_dispatch_event(&self, event: DispatchTraceEvent);

    /// Emit a lifecycle event. May allocate and block.
    fn emit_lifecycle_event(&self, event: &LifecycleEvent);

    /// Get current tracing metrics
    fn metrics(&self) -> TracingMetrics;

    /// Check if the provider is enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Shutdown the provider
    fn shutdown(&mut self);
}

/// Create a platform-specific tracing provider
///
/// - Linux: `TraceMarkerProvider`
/// - Other: `FallbackProvider`
///
/// # Errors
///
/// Returns an error if the platform provider cannot be created.
pub fn create_platform_provider() -> Result<Box<dyn TracingProvider>, TracingError> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(crate::platform::TraceMarkerProvider::new()))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Ok(Box::new(crate::platform::FallbackProvider::new()))
    }
}
