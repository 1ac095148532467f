//! Fallback for platforms without affinity or fixed-priority controls.

use crate::error::{RTError, RTResult};

pub(crate) fn pin_current_thread(_core: usize) -> RTResult {
    Err(RTError::Unsupported)
}

pub(crate) fn set_realtime_priority(_priority: i32) -> RTResult {
    Err(RTError::Unsupported)
}

pub(crate) fn lock_memory() -> RTResult {
    Err(RTError::Unsupported)
}

pub(crate) fn priority_range() -> (i32, i32) {
    (1, 99)
}
