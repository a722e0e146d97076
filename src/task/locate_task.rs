//! Single-settlement locate task handle

use super::cancel::CancelToken;
use super::outcome::{LocateOutcome, TaskState};
use crate::error::LocatorError;
use crate::executor::HomeHandle;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, trace};
use uuid::Uuid;

/// Unique identifier for a locate task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell tasks apart in logs
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// State shared between the caller's handle and the pipeline driving the search
pub(crate) struct TaskCore<T> {
    id: TaskId,
    state: AtomicU8,
    sender: Mutex<Option<oneshot::Sender<LocateOutcome<T>>>>,
    search_cancel: CancelToken,
}

impl<T> TaskCore<T> {
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn search_cancel(&self) -> &CancelToken {
        &self.search_cancel
    }

    /// Move out of `Pending` with `outcome`. Only the first caller wins;
    /// later outcomes are dropped.
    pub(crate) fn settle(&self, outcome: LocateOutcome<T>) -> bool {
        let next = outcome.state();
        if self
            .state
            .compare_exchange(
                TaskState::Pending as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            trace!(task = %self.id, lost = %next, settled = %self.state(), "Settlement lost race");
            return false;
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(sender) = sender {
            // Receiver may be gone if the caller dropped the task
            let _ = sender.send(outcome);
        }
        true
    }

    pub(crate) fn cancel(&self) -> bool {
        self.search_cancel.cancel();
        let settled = self.settle(LocateOutcome::Cancelled);
        if settled {
            debug!(task = %self.id, "Locate task cancelled");
        }
        settled
    }
}

trait Cancel: Send + Sync {
    fn cancel(&self) -> bool;
    fn state(&self) -> TaskState;
}

impl<T: Send> Cancel for TaskCore<T> {
    fn cancel(&self) -> bool {
        TaskCore::cancel(self)
    }

    fn state(&self) -> TaskState {
        TaskCore::state(self)
    }
}

/// Cloneable, type-erased handle that can only cancel a task
#[derive(Clone)]
pub struct TaskCanceller {
    id: TaskId,
    inner: Arc<dyn Cancel>,
}

impl TaskCanceller {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Cancel the task. Returns false if it had already settled.
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    pub fn state(&self) -> TaskState {
        self.inner.state()
    }
}

impl fmt::Debug for TaskCanceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCanceller")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Handle on one asynchronous search
///
/// Returned synchronously by the locator while the search runs on a worker.
pub struct LocateTask<T> {
    core: Arc<TaskCore<T>>,
    receiver: oneshot::Receiver<LocateOutcome<T>>,
    home: HomeHandle,
}

impl<T: Send + 'static> LocateTask<T> {
    pub(crate) fn new(home: HomeHandle) -> Self {
        let (sender, receiver) = oneshot::channel();
        let core = Arc::new(TaskCore {
            id: TaskId::new(),
            state: AtomicU8::new(TaskState::Pending as u8),
            sender: Mutex::new(Some(sender)),
            search_cancel: CancelToken::new(),
        });
        Self {
            core,
            receiver,
            home,
        }
    }

    pub(crate) fn core(&self) -> Arc<TaskCore<T>> {
        Arc::clone(&self.core)
    }

    pub fn id(&self) -> TaskId {
        self.core.id()
    }

    pub fn state(&self) -> TaskState {
        self.core.state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Cancel the task. Idempotent; has no effect once settled.
    pub fn cancel(&self) -> bool {
        self.core.cancel()
    }

    pub fn canceller(&self) -> TaskCanceller {
        TaskCanceller {
            id: self.core.id(),
            inner: self.core.clone(),
        }
    }

    /// Executor that follow-up work for this task must run on
    pub fn home_handle(&self) -> &HomeHandle {
        &self.home
    }

    /// Wait for the task to settle
    pub async fn result(self) -> LocateOutcome<T> {
        let id = self.core.id();
        self.receiver.await.unwrap_or_else(|_| {
            LocateOutcome::Failed(LocatorError::Internal(format!(
                "task {} dropped without settling",
                id
            )))
        })
    }
}

impl<T> fmt::Debug for LocateTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocateTask")
            .field("id", &self.core.id)
            .field("state", &self.core.state())
            .finish()
    }
}
