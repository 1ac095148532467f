//! Linux-specific platform implementation.

use libc::{MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, cpu_set_t, sched_param};

use crate::error::{RTError, RTResult};

fn last_os_error() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

/// Pin the calling thread to `core`.
pub(crate) fn pin_current_thread(core: usize) -> RTResult {
    let max = usize::try_from(libc::CPU_SETSIZE).unwrap_or(0);
    if core >= max {
        return Err(RTError::InvalidCore {
            core,
            max: max.saturating_sub(1),
        });
    }

    // SAFETY: cpu_set_t is a plain bit array; all-zero is the empty set.
    let mut set: cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `core` is below CPU_SETSIZE, checked above.
    unsafe { libc::CPU_SET(core, &mut set) };

    // SAFETY: pthread_self is always a valid handle for the calling thread.
    let thread = unsafe { libc::pthread_self() };
    // SAFETY: `set` is initialized and the size matches its type.
    let rc = unsafe {
        libc::pthread_setaffinity_np(thread, std::mem::size_of::<cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(RTError::AffinityFailed { core, code: rc });
    }
    Ok(())
}

/// Switch the calling thread to `SCHED_FIFO` at `priority`.
pub(crate) fn set_realtime_priority(priority: i32) -> RTResult {
    let param = sched_param {
        sched_priority: priority,
    };
    // SAFETY: pthread_self is always a valid handle for the calling thread.
    let thread = unsafe { libc::pthread_self() };
    // SAFETY: `param` is a valid sched_param for the duration of the call.
    let rc = unsafe { libc::pthread_setschedparam(thread, SCHED_FIFO, &param) };
    if rc != 0 {
        // Usually EPERM without CAP_SYS_NICE or an RLIMIT_RTPRIO grant
        return Err(RTError::SchedulingFailed { priority, code: rc });
    }
    Ok(())
}

/// Lock current and future pages of the process.
pub(crate) fn lock_memory() -> RTResult {
    // SAFETY: mlockall has no memory-safety preconditions.
    let rc = unsafe { libc::mlockall(MCL_CURRENT | MCL_FUTURE) };
    if rc != 0 {
        return Err(RTError::MemoryLockFailed {
            code: last_os_error(),
        });
    }
    Ok(())
}

/// `SCHED_FIFO` priority bounds, falling back to POSIX `1..=99`.
pub(crate) fn priority_range() -> (i32, i32) {
    // SAFETY: pure query, no preconditions.
    let min = unsafe { libc::sched_get_priority_min(SCHED_FIFO) };
    // SAFETY: pure query, no preconditions.
    let max = unsafe { libc::sched_get_priority_max(SCHED_FIFO) };
    if min < 0 || max < min {
        return (1, 99);
    }
    (min, max)
}
