//! Per-executor owner of the trace provider

use crate::events::DispatchEventCategory;
use crate::platform::FallbackProvider;
use crate::{
    DispatchTraceEvent, LifecycleEvent, TracingError, TracingMetrics, TracingProvider,
    provider::create_platform_provider,
};

/// Routes an executor's trace events to one provider.
///
/// Dispatch events pass a master switch and a per-category mute before they
/// reach the provider, so a worker can emit from its hot path without
/// checking anything itself. Lifecycle events only honour the master switch.
///
/// # Example
///
/// ```rust
/// use prioexec_tracing::{DispatchEventCategory, DispatchTraceEvent, TracingManager};
///
/// let mut manager = TracingManager::default();
/// manager.initialize().ok();
/// manager.mute_category(DispatchEventCategory::Selection);
/// manager.emit_dispatch_event(DispatchTraceEvent::CycleStart {
///     cycle: 1,
///     timestamp_ns: 1_000,
/// });
/// assert_eq!(manager.metrics().dispatch_events_emitted, 1);
/// manager.shutdown();
/// ```
pub struct TracingManager {
    provider: Box<dyn TracingProvider>,
    enabled: bool,
    muted: [bool; 3],
}

const fn slot(category: DispatchEventCategory) -> usize {
    match category {
        DispatchEventCategory::Timing => 0,
        DispatchEventCategory::Selection => 1,
        DispatchEventCategory::Fault => 2,
    }
}

impl TracingManager {
    /// Manager over the best provider for this platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform provider cannot be built.
    pub fn new() -> Result<Self, TracingError> {
        Ok(Self::with_provider(create_platform_provider()?))
    }

    /// Manager over `provider`.
    pub fn with_provider(provider: Box<dyn TracingProvider>) -> Self {
        Self {
            provider,
            enabled: true,
            muted: [false; 3],
        }
    }

    /// Prepare the provider before the executor spins.
    ///
    /// # Errors
    ///
    /// Forwards the provider's failure.
    pub fn initialize(&mut self) -> Result<(), TracingError> {
        self.provider.initialize()
    }

    /// Master switch. Disabled managers forward nothing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True if the switch is on and the provider accepts events.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.provider.is_enabled()
    }

    /// Stop forwarding dispatch events of `category`.
    pub fn mute_category(&mut self, category: DispatchEventCategory) {
        self.muted[slot(category)] = true;
    }

    /// Resume forwarding dispatch events of `category`.
    pub fn unmute_category(&mut self, category: DispatchEventCategory) {
        self.muted[slot(category)] = false;
    }

    /// Whether dispatch events of `category` reach the provider.
    pub fn is_category_enabled(&self, category: DispatchEventCategory) -> bool {
        self.enabled && !self.muted[slot(category)]
    }

    /// Forward one dispatch event. Called from worker hot paths.
    #[inline]
    pub fn emit_dispatch_event(&self, event: DispatchTraceEvent) {
        if self.is_category_enabled(event.category()) {
            self.provider.emit_dispatch_event(event);
        }
    }

    /// Forward one lifecycle event.
    pub fn emit_lifecycle_event(&self, event: &LifecycleEvent) {
        if self.enabled {
            self.provider.emit_lifecycle_event(event);
        }
    }

    /// Counters kept by the provider.
    pub fn metrics(&self) -> TracingMetrics {
        self.provider.metrics()
    }

    /// Release the provider's resources.
    pub fn shutdown(&mut self) {
        self.provider.shutdown();
    }
}

impl core::fmt::Debug for TracingManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TracingManager")
            .field("enabled", &self.enabled)
            .field("muted", &self.muted)
            .field("provider", &core::any::type_name_of_val(&*self.provider))
            .finish()
    }
}

impl Default for TracingManager {
    fn default() -> Self {
        Self::with_provider(Box::new(FallbackProvider::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Keeps every forwarded event so a cycle can be replayed.
    #[derive(Default, Clone)]
    struct CycleRecorder {
        dispatch: Arc<Mutex<Vec<DispatchTraceEvent>>>,
        lifecycle: Arc<Mutex<Vec<LifecycleEvent>>>,
    }

    impl CycleRecorder {
        fn kinds(&self) -> Vec<&'static str> {
            self.dispatch
                .lock()
                .map(|events| events.iter().map(DispatchTraceEvent::event_type).collect())
                .unwrap_or_default()
        }

        fn lifecycle_len(&self) -> usize {
            self.lifecycle.lock().map(|events| events.len()).unwrap_or(0)
        }
    }

    impl TracingProvider for CycleRecorder {
        fn initialize(&mut self) -> Result<(), TracingError> {
            Ok(())
        }

        fn emit_dispatch_event(&self, event: DispatchTraceEvent) {
            if let Ok(mut events) = self.dispatch.lock() {
                events.push(event);
            }
        }

        fn emit_lifecycle_event(&self, event: &LifecycleEvent) {
            if let Ok(mut events) = self.lifecycle.lock() {
                events.push(event.clone());
            }
        }

        fn metrics(&self) -> TracingMetrics {
            let dispatch = self.dispatch.lock().map(|e| e.len()).unwrap_or(0);
            TracingMetrics {
                dispatch_events_emitted: u64::try_from(dispatch).unwrap_or(u64::MAX),
                lifecycle_events_emitted: u64::try_from(self.lifecycle_len()).unwrap_or(u64::MAX),
                ..TracingMetrics::default()
            }
        }

        fn shutdown(&mut self) {}
    }

    /// One full cycle: wake, pick a timer, run it for 40us.
    fn dispatch_cycle(manager: &TracingManager, cycle: u64, source_id: u64) {
        let base = cycle * 1_000_000;
        manager.emit_dispatch_event(DispatchTraceEvent::CycleStart {
            cycle,
            timestamp_ns: base,
        });
        manager.emit_dispatch_event(DispatchTraceEvent::UnitSelected {
            cycle,
            source_id,
            kind: "timer",
            timestamp_ns: base + 10_000,
        });
        manager.emit_dispatch_event(DispatchTraceEvent::ExecuteEnd {
            cycle,
            source_id,
            runtime_ns: 40_000,
            timestamp_ns: base + 50_000,
        });
    }

    #[test]
    fn test_cycle_reaches_provider_in_order() {
        let recorder = CycleRecorder::default();
        let manager = TracingManager::with_provider(Box::new(recorder.clone()));

        dispatch_cycle(&manager, 1, 7);
        assert_eq!(
            recorder.kinds(),
            vec!["cycle_start", "unit_selected", "execute_end"]
        );
        assert_eq!(manager.metrics().dispatch_events_emitted, 3);
    }

    #[test]
    fn test_disabled_manager_stops_counting_cycles() {
        let recorder = CycleRecorder::default();
        let mut manager = TracingManager::with_provider(Box::new(recorder.clone()));

        dispatch_cycle(&manager, 1, 7);
        manager.emit_lifecycle_event(&LifecycleEvent::NodeAdded { node_id: 2 });
        manager.set_enabled(false);
        assert!(!manager.is_enabled());

        dispatch_cycle(&manager, 2, 7);
        manager.emit_dispatch_event(DispatchTraceEvent::DedupRejected {
            cycle: 2,
            timer_id: 7,
            timestamp_ns: 2_000_000,
        });
        manager.emit_lifecycle_event(&LifecycleEvent::NodeRemoved { node_id: 2 });

        let metrics = manager.metrics();
        assert_eq!(metrics.dispatch_events_emitted, 3);
        assert_eq!(metrics.lifecycle_events_emitted, 1);

        manager.set_enabled(true);
        dispatch_cycle(&manager, 3, 7);
        assert_eq!(manager.metrics().dispatch_events_emitted, 6);
    }

    #[test]
    fn test_muted_selection_keeps_timing() {
        let recorder = CycleRecorder::default();
        let mut manager = TracingManager::with_provider(Box::new(recorder.clone()));
        manager.mute_category(DispatchEventCategory::Selection);
        assert!(!manager.is_category_enabled(DispatchEventCategory::Selection));
        assert!(manager.is_category_enabled(DispatchEventCategory::Timing));

        dispatch_cycle(&manager, 1, 3);
        manager.emit_dispatch_event(DispatchTraceEvent::DedupRejected {
            cycle: 1,
            timer_id: 3,
            timestamp_ns: 20_000,
        });
        assert_eq!(recorder.kinds(), vec!["cycle_start", "execute_end"]);

        manager.unmute_category(DispatchEventCategory::Selection);
        manager.emit_dispatch_event(DispatchTraceEvent::DedupRejected {
            cycle: 2,
            timer_id: 3,
            timestamp_ns: 1_020_000,
        });
        assert_eq!(
            recorder.kinds(),
            vec!["cycle_start", "execute_end", "dedup_rejected"]
        );
    }

    #[test]
    fn test_wait_fault_counted_by_fallback() -> Result<(), TracingError> {
        let mut manager = TracingManager::default();
        manager.initialize()?;
        dispatch_cycle(&manager, 1, 1);
        manager.emit_dispatch_event(DispatchTraceEvent::WaitFault {
            cycle: 2,
            status: "empty",
            timestamp_ns: 2_000_000,
        });

        let metrics = manager.metrics();
        assert_eq!(metrics.dispatch_events_emitted, 4);
        assert_eq!(metrics.wait_faults, 1);
        manager.shutdown();
        Ok(())
    }

    #[test]
    fn test_debug_shows_switches() {
        let mut manager = TracingManager::with_provider(Box::new(CycleRecorder::default()));
        manager.mute_category(DispatchEventCategory::Fault);
        let rendered = format!("{manager:?}");
        assert!(rendered.contains("CycleRecorder"));
        assert!(rendered.contains("[false, false, true]"));
    }
}
