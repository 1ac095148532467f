//! Prelude module for common real-time setup types.

pub use crate::error::{RTError, RTResult};
pub use crate::rt_setup::{RtSetupReport, SetupStep, WorkerRtSetup};
pub use crate::{DEFAULT_RT_PRIORITY, available_cores, priority_range};
