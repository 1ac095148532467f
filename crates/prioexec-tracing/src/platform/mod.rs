//! Platform-specific tracing providers

mod fallback;

#[cfg(target_os = "linux")]
mod linux;

pub use fallback::FallbackProvider;

#[cfg(target_os = "linux")]
pub use linux::TraceMarkerProvider;

/// Log a lifecycle event through `tracing`.
///
/// Shared by every provider; lifecycle events are rare and always logged.
pub(crate) fn log_lifecycle_event(event: &crate::LifecycleEvent) {
    use crate::LifecycleEvent;

    match event {
        LifecycleEvent::Started { name, threads } => {
            tracing::info!(executor = %name, threads = threads, "Executor started");
        }
        LifecycleEvent::Stopped { name, cycles } => {
            tracing::info!(executor = %name, cycles = cycles, "Executor stopped");
        }
        LifecycleEvent::WorkerStarted { worker, core_id } => {
            tracing::debug!(worker = worker, core_id = core_id, "Worker started");
        }
        LifecycleEvent::WorkerRtDegraded { worker, reason } => {
            tracing::warn!(
                worker = worker,
                reason = %reason,
                "Worker running without full RT setup"
            );
        }
        LifecycleEvent::NodeAdded { node_id } => {
            tracing::debug!(node_id = node_id, "Node added");
        }
        LifecycleEvent::NodeRemoved { node_id } => {
            tracing::debug!(node_id = node_id, "Node removed");
        }
        LifecycleEvent::CallbackFailed { source_id, reason } => {
            tracing::error!(source_id = source_id, reason = %reason, "Callback failed");
        }
    }
}
