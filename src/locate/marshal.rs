//! Delivery of settled outcomes to the home thread

use crate::error::{LocatorError, LocatorResult};
use crate::executor::panic_message;
use crate::task::{LocateOutcome, LocateTask, TaskId};
use crate::world::FoundLocation;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Caller-side reactions to a locate outcome
///
/// Every method runs on the home thread. None of them runs when the task was
/// cancelled or when [`is_live`](Self::is_live) reports false at delivery.
pub trait LocateHandler<T>: Send + 'static {
    /// Whether the owner of the locate still exists
    fn is_live(&self) -> bool;

    /// Apply the found location. An error is logged as a failed signal.
    fn on_found(&mut self, found: FoundLocation<T>) -> LocatorResult<()>;

    /// The search finished without a match
    fn on_empty(&mut self);

    /// The search failed; apply a safe fallback
    fn on_failed(&mut self, error: &LocatorError);

    /// The deadline elapsed; the search has already been told to stop
    fn on_timed_out(&mut self, after: Duration);
}

/// Waits for tasks to settle and replays the outcome on the home thread
#[derive(Clone)]
pub struct CompletionMarshaler {
    runtime: Handle,
}

impl CompletionMarshaler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Deliver `task`'s outcome to `handler` on the task's home executor
    ///
    /// `slot` is dropped on the home thread before any handler method runs.
    /// It is also dropped if the home executor is gone, so bookkeeping such
    /// as an ongoing flag held in an RAII guard always clears.
    pub fn attach<T, H, G>(&self, task: LocateTask<T>, handler: H, slot: G)
    where
        T: Send + 'static,
        H: LocateHandler<T>,
        G: Send + 'static,
    {
        let id = task.id();
        let home = task.home_handle().clone();

        self.runtime.spawn(async move {
            let outcome = task.result().await;
            let thunk = move || deliver(id, outcome, handler, slot);
            if let Err(e) = home.submit(thunk) {
                warn!(task = %id, error = %e, "Dropping locate outcome");
            }
        });
    }
}

fn deliver<T, H, G>(id: TaskId, outcome: LocateOutcome<T>, mut handler: H, slot: G)
where
    H: LocateHandler<T>,
{
    drop(slot);

    let result = catch_unwind(AssertUnwindSafe(|| {
        if matches!(outcome, LocateOutcome::Cancelled) {
            debug!(task = %id, "Locate cancelled, skipping effects");
            return;
        }

        // Checked now rather than at settlement: the owner may have been
        // removed while the outcome waited in the queue.
        if !handler.is_live() {
            debug!(task = %id, "Owner no longer live when locate result arrived");
            return;
        }

        dispatch(id, outcome, &mut handler);
    }));

    if let Err(payload) = result {
        error!(
            task = %id,
            panic = %panic_message(payload.as_ref()),
            "Locate completion handler panicked"
        );
    }
}

fn dispatch<T, H: LocateHandler<T>>(id: TaskId, outcome: LocateOutcome<T>, handler: &mut H) {
    match outcome {
        LocateOutcome::Succeeded(found) => {
            let position = found.position;
            info!(task = %id, %position, "Location found, updating owner");
            if let Err(e) = handler.on_found(found) {
                let e = LocatorError::SignalFailed {
                    position,
                    reason: e.to_string(),
                };
                error!(task = %id, error = %e, "Failed to apply found location");
            }
        }
        LocateOutcome::EmptyResult => {
            info!(task = %id, "No location found");
            handler.on_empty();
        }
        LocateOutcome::Failed(e) => {
            error!(task = %id, error = %e, "Exception while locating");
            handler.on_failed(&e);
        }
        LocateOutcome::TimedOut(after) => {
            warn!(task = %id, after_secs = after.as_secs_f64(), "Locate timed out");
            handler.on_timed_out(after);
        }
        LocateOutcome::Cancelled => {}
    }
}
