//! Single-threaded home executor

use super::panic_message;
use crate::error::{LocatorError, LocatorResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Work queued for the home thread
pub type HomeThunk = Box<dyn FnOnce() + Send + 'static>;

/// Poll interval for [`HomeLoop::run_until`]
const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Factory for the home queue
pub struct HomeExecutor;

impl HomeExecutor {
    /// Create a home queue. The caller drives the returned loop on its own
    /// thread, typically once per tick via [`HomeLoop::run_pending`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (HomeHandle, HomeLoop) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let home_thread = Arc::new(OnceLock::new());
        (
            HomeHandle {
                sender,
                home_thread: Arc::clone(&home_thread),
            },
            HomeLoop {
                receiver,
                home_thread,
            },
        )
    }

    /// Create a home queue drained by a dedicated thread
    ///
    /// The thread exits once every [`HomeHandle`] is dropped.
    pub fn spawn(name: &str) -> LocatorResult<(HomeHandle, JoinHandle<()>)> {
        let (handle, home_loop) = Self::new();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || home_loop.run())
            .map_err(|e| LocatorError::io("spawning home thread", e))?;
        Ok((handle, worker))
    }
}

/// Submission side of the home queue. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct HomeHandle {
    sender: mpsc::UnboundedSender<HomeThunk>,
    home_thread: Arc<OnceLock<ThreadId>>,
}

impl HomeHandle {
    /// Queue `thunk` behind everything already submitted
    pub fn submit<F>(&self, thunk: F) -> LocatorResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Box::new(thunk))
            .map_err(|_| LocatorError::HomeExecutorClosed)
    }

    /// Whether the current thread is the one draining this queue
    pub fn is_home_thread(&self) -> bool {
        self.home_thread.get() == Some(&thread::current().id())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for HomeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeHandle")
            .field("home_thread", &self.home_thread.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Consumer side of the home queue
///
/// Bound to the first thread that drains it.
pub struct HomeLoop {
    receiver: mpsc::UnboundedReceiver<HomeThunk>,
    home_thread: Arc<OnceLock<ThreadId>>,
}

impl HomeLoop {
    /// Run everything queued so far, in submission order
    pub fn run_pending(&mut self) -> usize {
        self.claim_thread();
        let mut ran = 0;
        while let Ok(thunk) = self.receiver.try_recv() {
            run_thunk(thunk);
            ran += 1;
        }
        ran
    }

    /// Tick until `done` returns true or `limit` elapses. Returns `done()`.
    pub fn run_until<P>(&mut self, limit: Duration, mut done: P) -> bool
    where
        P: FnMut() -> bool,
    {
        let deadline = Instant::now() + limit;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(TICK_INTERVAL);
        }
    }

    /// Block the current thread draining the queue until all handles drop
    pub fn run(mut self) {
        self.claim_thread();
        debug!("Home loop started");
        while let Some(thunk) = self.receiver.blocking_recv() {
            run_thunk(thunk);
        }
        debug!("Home loop stopped");
    }

    fn claim_thread(&self) {
        let current = thread::current().id();
        let owner = *self.home_thread.get_or_init(|| current);
        debug_assert_eq!(owner, current, "home loop drained from two threads");
    }
}

fn run_thunk(thunk: HomeThunk) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(thunk)) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "Home thread task panicked"
        );
    }
}
