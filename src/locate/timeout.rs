//! Deadline supervision for searches

use crate::executor::panic_message;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tracing::debug;

/// Result of racing a future against a deadline
#[derive(Debug, PartialEq, Eq)]
pub enum Supervised<T> {
    Completed(T),
    TimedOut(Duration),
}

/// Race `future` against `deadline`
///
/// If the deadline wins, `on_timeout` runs once to cancel the underlying work
/// and the future is dropped. A panic inside `on_timeout` is logged and
/// ignored. With no deadline the future simply runs to completion.
pub async fn supervise<F, C>(future: F, deadline: Option<Duration>, on_timeout: C) -> Supervised<F::Output>
where
    F: Future,
    C: FnOnce(),
{
    let Some(deadline) = deadline else {
        return Supervised::Completed(future.await);
    };

    tokio::pin!(future);
    tokio::select! {
        // A result that is ready at the deadline still counts
        biased;
        output = &mut future => Supervised::Completed(output),
        _ = tokio::time::sleep(deadline) => {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(on_timeout)) {
                debug!(
                    panic = %panic_message(payload.as_ref()),
                    "Ignoring failure while cancelling timed-out search"
                );
            }
            Supervised::TimedOut(deadline)
        }
    }
}
