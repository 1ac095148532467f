//! Tracing metrics for observability

/// Metrics collected for tracing observability
///
/// All counters are monotonically increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingMetrics {
    /// Total number of dispatch events emitted
    pub dispatch_events_emitted: u64,

    /// Total number of lifecycle events emitted
    pub lifecycle_events_emitted: u64,

    /// Number of dispatch events dropped because the sink was busy
    pub events_dropped: u64,

    /// Number of wait faults seen
    pub wait_faults: u64,
}

impl TracingMetrics {
    /// Create new metrics with zero values
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate event drop rate
    #[allow(clippy::cast_precision_loss, reason = "statistics only")]
    pub fn drop_rate(&self) -> f64 {
        let total = self
            .dispatch_events_emitted
            .saturating_add(self.events_dropped);
        if total == 0 {
            return 0.0;
        }
        (self.events_dropped as f64) / (total as f64)
    }

    /// Check if health indicators are within acceptable bounds
    pub fn is_healthy(&self) -> bool {
        self.drop_rate() < 0.01 && self.wait_faults == 0
    }

    /// Merge metrics from another instance
    pub fn merge(&mut self, other: &TracingMetrics) {
        self.dispatch_events_emitted = self
            .dispatch_events_emitted
            .saturating_add(other.dispatch_events_emitted);
        self.lifecycle_events_emitted = self
            .lifecycle_events_emitted
            .saturating_add(other.lifecycle_events_emitted);
        self.events_dropped = self.events_dropped.saturating_add(other.events_dropped);
        self.wait_faults = self.wait_faults.saturating_add(other.wait_faults);
    }
}
