//! Per-worker real-time setup configuration.

use prioexec_errors::config::ConfigError;
use serde::{Deserialize, Serialize};

use crate::error::RTError;
use crate::{DEFAULT_RT_PRIORITY, platform};

/// Lowest priority accepted by [`WorkerRtSetup::validate`].
pub const MIN_RT_PRIORITY: i32 = 1;

/// Highest priority accepted by [`WorkerRtSetup::validate`].
pub const MAX_RT_PRIORITY: i32 = 99;

/// Real-time parameters applied by each worker thread to itself.
///
/// The priority is clamped to the platform's `SCHED_FIFO` range when
/// applied, so the default of 98 becomes the platform maximum minus one on
/// Linux and `THREAD_PRIORITY_TIME_CRITICAL` on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerRtSetup {
    /// Pin worker `i` to logical core `i` (modulo the core count).
    pub pin_to_core: bool,

    /// Switch the worker to fixed-priority real-time scheduling.
    pub realtime: bool,

    /// Requested real-time priority.
    pub priority: i32,

    /// Lock all current and future memory pages.
    ///
    /// Process-wide; applied by whichever worker gets there first.
    pub lock_memory: bool,
}

impl Default for WorkerRtSetup {
    fn default() -> Self {
        Self {
            pin_to_core: true,
            realtime: true,
            priority: DEFAULT_RT_PRIORITY,
            lock_memory: false,
        }
    }
}

impl WorkerRtSetup {
    /// Create a new setup with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal setup (no special configuration).
    pub fn minimal() -> Self {
        Self {
            pin_to_core: false,
            realtime: false,
            priority: DEFAULT_RT_PRIORITY,
            lock_memory: false,
        }
    }

    /// Create a setup for tests: pinning only, no privileged calls.
    pub fn testing() -> Self {
        Self {
            pin_to_core: true,
            realtime: false,
            priority: DEFAULT_RT_PRIORITY,
            lock_memory: false,
        }
    }

    /// Set core pinning.
    pub fn with_pin_to_core(mut self, enabled: bool) -> Self {
        self.pin_to_core = enabled;
        self
    }

    /// Set real-time scheduling.
    pub fn with_realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }

    /// Set the requested priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set memory locking.
    pub fn with_lock_memory(mut self, enabled: bool) -> Self {
        self.lock_memory = enabled;
        self
    }

    /// Check if any RT features are enabled.
    pub fn has_rt_features(&self) -> bool {
        self.pin_to_core || self.realtime || self.lock_memory
    }

    /// Validate the requested priority.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPriority`] when real-time scheduling is
    /// enabled and the priority is outside `1..=99`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.realtime && !(MIN_RT_PRIORITY..=MAX_RT_PRIORITY).contains(&self.priority) {
            return Err(ConfigError::InvalidPriority {
                priority: self.priority,
                min: MIN_RT_PRIORITY,
                max: MAX_RT_PRIORITY,
            });
        }
        Ok(())
    }

    /// Priority actually requested from the OS.
    pub fn effective_priority(&self) -> i32 {
        let (min, max) = platform::priority_range();
        self.priority.clamp(min, max)
    }

    /// Apply this setup to the calling thread.
    ///
    /// `core_id` is reduced modulo the number of available cores. Each step
    /// is attempted independently; one failing does not skip the others.
    pub fn apply(&self, core_id: usize) -> RtSetupReport {
        let affinity = if self.pin_to_core {
            let core = core_id.checked_rem(crate::available_cores()).unwrap_or(0);
            SetupStep::from_result(platform::pin_current_thread(core))
        } else {
            SetupStep::Skipped
        };

        let scheduling = if self.realtime {
            SetupStep::from_result(platform::set_realtime_priority(self.effective_priority()))
        } else {
            SetupStep::Skipped
        };

        let memory_lock = if self.lock_memory {
            SetupStep::from_result(platform::lock_memory())
        } else {
            SetupStep::Skipped
        };

        RtSetupReport {
            affinity,
            scheduling,
            memory_lock,
        }
    }
}

/// Outcome of one setup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// Not requested
    Skipped,
    /// Took effect
    Applied,
    /// Requested but refused
    Failed(RTError),
}

impl SetupStep {
    fn from_result(result: Result<(), RTError>) -> Self {
        match result {
            Ok(()) => SetupStep::Applied,
            Err(e) => SetupStep::Failed(e),
        }
    }

    /// The error, if this step failed.
    pub fn error(&self) -> Option<RTError> {
        match self {
            SetupStep::Failed(e) => Some(*e),
            _ => None,
        }
    }
}

/// What [`WorkerRtSetup::apply`] achieved on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtSetupReport {
    /// CPU pinning
    pub affinity: SetupStep,
    /// Real-time scheduling class
    pub scheduling: SetupStep,
    /// Memory locking
    pub memory_lock: SetupStep,
}

impl RtSetupReport {
    /// True when no requested step failed.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Errors of all failed steps.
    pub fn failures(&self) -> impl Iterator<Item = RTError> {
        [self.affinity, self.scheduling, self.memory_lock]
            .into_iter()
            .filter_map(|step| step.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let setup = WorkerRtSetup::default();
        assert!(setup.pin_to_core);
        assert!(setup.realtime);
        assert_eq!(setup.priority, 98);
        assert!(!setup.lock_memory);
    }

    #[test]
    fn test_minimal() {
        let setup = WorkerRtSetup::minimal();
        assert!(!setup.has_rt_features());
    }

    #[test]
    fn test_testing() {
        let setup = WorkerRtSetup::testing();
        assert!(setup.pin_to_core);
        assert!(!setup.realtime);
    }

    #[test]
    fn test_builder_pattern() {
        let setup = WorkerRtSetup::new()
            .with_realtime(false)
            .with_lock_memory(true)
            .with_priority(50);

        assert!(!setup.realtime);
        assert!(setup.lock_memory);
        assert_eq!(setup.priority, 50);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let err = WorkerRtSetup::default().with_priority(0).validate();
        assert_eq!(
            err,
            Err(ConfigError::InvalidPriority {
                priority: 0,
                min: 1,
                max: 99
            })
        );
    }

    #[test]
    fn test_validate_ignores_priority_without_realtime() {
        let setup = WorkerRtSetup::minimal().with_priority(500);
        assert_eq!(setup.validate(), Ok(()));
    }

    #[test]
    fn test_effective_priority_is_clamped() {
        let (min, max) = crate::priority_range();
        let setup = WorkerRtSetup::default().with_priority(i32::MAX);
        assert_eq!(setup.effective_priority(), max);
        let setup = WorkerRtSetup::default().with_priority(i32::MIN);
        assert_eq!(setup.effective_priority(), min);
    }

    #[test]
    fn test_minimal_apply_skips_everything() {
        let report = WorkerRtSetup::minimal().apply(0);
        assert_eq!(report.affinity, SetupStep::Skipped);
        assert_eq!(report.scheduling, SetupStep::Skipped);
        assert_eq!(report.memory_lock, SetupStep::Skipped);
        assert!(report.is_complete());
    }

    #[test]
    fn test_report_collects_failures() {
        let report = RtSetupReport {
            affinity: SetupStep::Applied,
            scheduling: SetupStep::Failed(RTError::SchedulingFailed {
                priority: 98,
                code: 1,
            }),
            memory_lock: SetupStep::Failed(RTError::Unsupported),
        };
        assert!(!report.is_complete());
        assert_eq!(report.failures().count(), 2);
    }
}
