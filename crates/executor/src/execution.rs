//! Take, run and release one selected unit.

use core::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use prioexec_errors::{CallbackError, ExecutorError};
use prioexec_tracing::{DispatchTraceEvent, LifecycleEvent};
use tracing::{debug, error, warn};

use crate::dispatcher::Dispatcher;
use crate::entities::SourceKind;
use crate::selection::SelectedUnit;

/// Execute `unit` on the calling thread.
///
/// Returns whether the callback ran. A failed or empty take skips the cycle
/// and is not an error. A panicking callback is reported like a failing one.
/// Gate and timer bookkeeping is left to the caller.
pub(crate) fn execute_unit(
    dispatcher: &Dispatcher,
    cycle: u64,
    unit: &SelectedUnit,
) -> Result<bool, ExecutorError> {
    let source = unit.source();
    let handle = source.handle();

    let mut payload = match handle.take() {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(source_id = %source.id(), kind = %source.kind(), "Source woke without data");
            return Ok(false);
        }
        Err(e) => {
            dispatcher.counters().inc_take_failure();
            warn!(
                source_id = %source.id(),
                kind = %source.kind(),
                error = %e,
                "Take failed, skipping cycle"
            );
            return Ok(false);
        }
    };

    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handle.execute(&mut payload)))
        .unwrap_or_else(|panicked| {
            Err(CallbackError::new(format!(
                "callback panicked: {}",
                panic_message(&*panicked)
            )))
        });
    let elapsed = started.elapsed();

    dispatcher.runtime().record(elapsed);
    count_dispatch(dispatcher, unit.kind());
    dispatcher.trace_event(|timestamp_ns| DispatchTraceEvent::ExecuteEnd {
        cycle,
        source_id: source.id().get(),
        runtime_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
        timestamp_ns,
    });

    if let Err(e) = handle.release(payload) {
        error!(source_id = %source.id(), error = %e, "Failed to return taken data");
    }

    match outcome {
        Ok(()) => Ok(true),
        Err(e) => {
            dispatcher.counters().inc_callback_failure();
            error!(source_id = %source.id(), kind = %source.kind(), error = %e, "Callback failed");
            dispatcher.lifecycle(&LifecycleEvent::CallbackFailed {
                source_id: source.id().get(),
                reason: e.to_string(),
            });
            Err(ExecutorError::callback(source.id().get(), e))
        }
    }
}

/// Text of a panic payload, if it carries any.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn count_dispatch(dispatcher: &Dispatcher, kind: SourceKind) {
    let counters = dispatcher.counters();
    match kind {
        SourceKind::Timer => counters.inc_timer_dispatch(),
        SourceKind::Subscription => counters.inc_subscription_dispatch(),
        SourceKind::Service => counters.inc_service_dispatch(),
        SourceKind::Client => counters.inc_client_dispatch(),
        SourceKind::Waitable => counters.inc_waitable_dispatch(),
    }
}
