//! Prelude module for common tracing types.

pub use crate::error::TracingError;
pub use crate::events::{DispatchEventCategory, DispatchTraceEvent, LifecycleEvent};
pub use crate::manager::TracingManager;
pub use crate::metrics::TracingMetrics;
pub use crate::provider::TracingProvider;
