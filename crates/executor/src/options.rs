//! Executor configuration.

use std::time::Duration;

use prioexec_errors::ConfigError;
use prioexec_rt::WorkerRtSetup;
use serde::{Deserialize, Serialize};

/// Default poll timeout for each readiness wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Construction-time options shared by both executors.
///
/// Loadable from JSON; every field may be omitted.
///
/// ```rust
/// use std::time::Duration;
/// use prioexec_executor::ExecutorOptions;
///
/// let options = ExecutorOptions::from_json(
///     r#"{ "name": "control", "thread_count": 2, "poll_timeout_us": 500 }"#,
/// )?;
/// assert_eq!(options.thread_count, 2);
/// assert_eq!(options.poll_timeout, Duration::from_micros(500));
/// assert!(!options.use_priorities);
/// # Ok::<(), prioexec_errors::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorOptions {
    /// Diagnostic label.
    pub name: String,

    /// Worker threads, caller included. 0 means one per hardware thread.
    pub thread_count: usize,

    /// Yield the processor once between selection and execution.
    pub yield_before_execute: bool,

    /// Upper bound on each readiness wait.
    #[serde(rename = "poll_timeout_us", with = "duration_micros")]
    pub poll_timeout: Duration,

    /// Select by source priority instead of kind precedence.
    pub use_priorities: bool,

    /// Real-time setup each multi-threaded worker applies to itself.
    pub rt_setup: WorkerRtSetup,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            name: "prioexec".to_owned(),
            thread_count: 0,
            yield_before_execute: false,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            use_priorities: false,
            rt_setup: WorkerRtSetup::default(),
        }
    }
}

impl ExecutorOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagnostic name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the worker count.
    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    /// Enable or disable the pre-execute yield.
    pub fn with_yield_before_execute(mut self, enabled: bool) -> Self {
        self.yield_before_execute = enabled;
        self
    }

    /// Set the poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Enable or disable priority selection.
    pub fn with_use_priorities(mut self, enabled: bool) -> Self {
        self.use_priorities = enabled;
        self
    }

    /// Set the per-worker real-time setup.
    pub fn with_rt_setup(mut self, setup: WorkerRtSetup) -> Self {
        self.rt_setup = setup;
        self
    }

    /// Worker count with 0 resolved to the hardware concurrency.
    pub fn resolved_thread_count(&self) -> usize {
        if self.thread_count == 0 {
            prioexec_rt::available_cores()
        } else {
            self.thread_count
        }
    }

    /// Check the options.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ZeroPollTimeout);
        }
        self.rt_setup.validate()
    }

    /// Parse and validate options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and the
    /// [`validate`](Self::validate) error for invalid values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(json).map_err(ConfigError::parse)?;
        options.validate()?;
        Ok(options)
    }
}

mod duration_micros {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}
