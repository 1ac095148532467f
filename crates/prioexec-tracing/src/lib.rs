//! RT-safe dispatch tracing for the priority executor
//!
//! This crate provides platform-specific tracing of dispatch cycles:
//! - **Linux**: ftrace markers via `trace_marker`
//! - **Other platforms**: structured logging of fault events
//!
//! # RT-Safety Guarantees
//!
//! All [`DispatchTraceEvent`] emissions are designed to be RT-safe:
//! - Events are `Copy`, formatted into a stack buffer
//! - No blocking: a contended provider drops and counts the event
//! - Bounded execution time
//!
//! [`LifecycleEvent`]s (executor start/stop, node registration, worker RT
//! degradation) may allocate and are emitted off the hot path.
//!
//! # Example
//!
//! ```rust
//! use prioexec_tracing::{DispatchTraceEvent, TracingManager, TracingProvider};
//! use prioexec_tracing::platform::FallbackProvider;
//!
//! let mut manager = TracingManager::with_provider(Box::new(FallbackProvider::new()));
//! manager.initialize().ok();
//!
//! manager.emit_dispatch_event(DispatchTraceEvent::CycleStart {
//!     cycle: 1,
//!     timestamp_ns: 1_000_000,
//! });
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod events;
pub mod manager;
pub mod metrics;
pub mod platform;
pub mod prelude;
pub mod provider;

pub use error::TracingError;
pub use events::{DispatchEventCategory, DispatchTraceEvent, LifecycleEvent, MARKER_LINE_LEN};
pub use manager::TracingManager;
pub use metrics::TracingMetrics;
pub use provider::{TracingProvider, create_platform_provider};
