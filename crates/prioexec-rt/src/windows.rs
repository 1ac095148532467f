//! Windows-specific platform implementation.

use windows::Win32::System::Threading::{
    GetCurrentThread, SetThreadAffinityMask, SetThreadPriority, THREAD_PRIORITY_TIME_CRITICAL,
};

use crate::error::{RTError, RTResult};

fn last_os_error() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

/// Pin the calling thread to `core`.
pub(crate) fn pin_current_thread(core: usize) -> RTResult {
    let max = usize::BITS as usize;
    let Some(mask) = 1usize.checked_shl(u32::try_from(core).unwrap_or(u32::MAX)) else {
        return Err(RTError::InvalidCore {
            core,
            max: max.saturating_sub(1),
        });
    };
    // SAFETY: GetCurrentThread returns a pseudo-handle valid for this thread.
    let thread = unsafe { GetCurrentThread() };
    // SAFETY: `thread` is valid and `mask` selects one existing bit.
    let previous = unsafe { SetThreadAffinityMask(thread, mask) };
    if previous == 0 {
        return Err(RTError::AffinityFailed {
            core,
            code: last_os_error(),
        });
    }
    Ok(())
}

/// Raise the calling thread to `THREAD_PRIORITY_TIME_CRITICAL`.
///
/// Windows has no numeric FIFO levels; any priority maps to time-critical.
pub(crate) fn set_realtime_priority(priority: i32) -> RTResult {
    // SAFETY: GetCurrentThread returns a pseudo-handle valid for this thread.
    let thread = unsafe { GetCurrentThread() };
    // SAFETY: `thread` is valid for the calling thread.
    unsafe { SetThreadPriority(thread, THREAD_PRIORITY_TIME_CRITICAL) }.map_err(|e| {
        RTError::SchedulingFailed {
            priority,
            code: e.code().0,
        }
    })
}

pub(crate) fn lock_memory() -> RTResult {
    Err(RTError::Unsupported)
}

pub(crate) fn priority_range() -> (i32, i32) {
    (1, 99)
}
