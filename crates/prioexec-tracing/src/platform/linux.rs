//! Linux ftrace `trace_marker` provider

use std::fs::File;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::MARKER_LINE_LEN;
use crate::{DispatchTraceEvent, LifecycleEvent, TracingError, TracingMetrics, TracingProvider};

const TRACE_MARKER_PATHS: [&str; 2] = [
    "/sys/kernel/tracing/trace_marker",
    "/sys/kernel/debug/tracing/trace_marker",
];

/// Provider writing dispatch events to the ftrace `trace_marker` file
///
/// Lines show up interleaved with scheduler events in `trace-cmd` or
/// `perfetto`, which makes worker migration and wake latency visible next to
/// dispatch decisions.
///
/// # RT Safety
///
/// Lines are formatted into a stack buffer. The file lock is taken with
/// `try_lock`; a busy sink drops and counts the event.
///
/// # Permissions
///
/// Requires write access to `trace_marker`, normally root. Without it the
/// provider still counts events and logs faults like [`FallbackProvider`].
///
/// [`FallbackProvider`]: super::FallbackProvider
#[derive(Debug, Default)]
pub struct TraceMarkerProvider {
    trace_file: Option<Mutex<File>>,
    dispatch_events: AtomicU64,
    lifecycle_events: AtomicU64,
    events_dropped: AtomicU64,
    wait_faults: AtomicU64,
}

impl TraceMarkerProvider {
    /// Create a provider; the marker file is opened by `initialize`.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a marker file has been opened.
    pub fn has_marker(&self) -> bool {
        self.trace_file.is_some()
    }

    fn write_marker(&self, event: DispatchTraceEvent) {
        let Some(mutex) = &self.trace_file else {
            return;
        };
        let Ok(mut file) = mutex.try_lock() else {
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let mut buf = [0u8; MARKER_LINE_LEN];
        let written = event
            .write_marker(&mut buf)
            .ok()
            .and_then(|len| buf.get(..len))
            .map(|line| file.write_all(line));
        if !matches!(written, Some(Ok(()))) {
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl TracingProvider for TraceMarkerProvider {
    fn initialize(&mut self) -> Result<(), TracingError> {
        for path in TRACE_MARKER_PATHS {
            match File::options().write(true).open(path) {
                Ok(mut file) => {
                    if file.write_all(b"prioexec: tracing initialized").is_ok() {
                        self.trace_file = Some(Mutex::new(file));
                        tracing::info!(path = path, "trace_marker tracing initialized");
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::debug!(path = path, error = %e, "trace_marker not writable");
                }
            }
        }
        tracing::warn!("No writable trace_marker, falling back to structured logging");
        Ok(())
    }

    fn emit_dispatch_event(&self, event: DispatchTraceEvent) {
        self.dispatch_events.fetch_add(1, Ordering::Relaxed);
        if let DispatchTraceEvent::WaitFault { cycle, status, .. } = event {
            self.wait_faults.fetch_add(1, Ordering::Relaxed);
            if self.trace_file.is_none() {
                tracing::warn!(cycle = cycle, status = status, "Wait fault");
            }
        }
        self.write_marker(event);
    }

    fn emit_lifecycle_event(&self, event: &LifecycleEvent) {
        self.lifecycle_events.fetch_add(1, Ordering::Relaxed);
        super::log_lifecycle_event(event);
    }

    fn metrics(&self) -> TracingMetrics {
        TracingMetrics {
            dispatch_events_emitted: self.dispatch_events.load(Ordering::Relaxed),
            lifecycle_events_emitted: self.lifecycle_events.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            wait_faults: self.wait_faults.load(Ordering::Relaxed),
        }
    }

    fn shutdown(&mut self) {
        self.trace_file = None;
        tracing::debug!("trace_marker provider shutdown");
    }
}
