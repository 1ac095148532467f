//! Fallback provider using structured logging

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{DispatchTraceEvent, LifecycleEvent, TracingError, TracingMetrics, TracingProvider};

/// Fallback provider
///
/// Logs fault events and dedup rejections through `tracing`. Timing and
/// selection events are counted and dropped to keep the hot path cheap.
#[derive(Debug, Default)]
pub struct FallbackProvider {
    dispatch_events: AtomicU64,
    lifecycle_events: AtomicU64,
    wait_faults: AtomicU64,
}

impl FallbackProvider {
    /// Create a new fallback provider
    pub fn new() -> Self {
        Self::default()
    }
}

impl TracingProvider for FallbackProvider {
    fn initialize(&mut self) -> Result<(), TracingError> {
        tracing::debug!("Using fallback tracing provider (structured logging only)");
        Ok(())
    }

    fn emit_dispatch_event(&self, event: DispatchTraceEvent) {
        self.dispatch_events.fetch_add(1, Ordering::Relaxed);
        match event {
            DispatchTraceEvent::WaitFault { cycle, status, .. } => {
                self.wait_faults.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(cycle = cycle, status = status, "Wait fault");
            }
            DispatchTraceEvent::DedupRejected {
                cycle, timer_id, ..
            } => {
                tracing::trace!(cycle = cycle, timer_id = timer_id, "Timer already owned");
            }
            _ => {}
        }
    }

    fn emit_lifecycle_event(&self, event: &LifecycleEvent) {
        self.lifecycle_events.fetch_add(1, Ordering::Relaxed);
        super::log_lifecycle_event(event);
    }

    fn metrics(&self) -> TracingMetrics {
        TracingMetrics {
            dispatch_events_emitted: self.dispatch_events.load(Ordering::Relaxed),
            lifecycle_events_emitted: self.lifecycle_events.load(Ordering::Relaxed),
            events_dropped: 0,
            wait_faults: self.wait_faults.load(Ordering::Relaxed),
        }
    }

    fn shutdown(&mut self) {
        tracing::debug!("Fallback tracing provider shutdown");
    }
}
