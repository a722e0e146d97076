//! Fixed-size worker pool for searches

use super::panic_message;
use crate::config::schema::ExecutorConfig;
use crate::error::{LocatorError, LocatorResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How long dropping an owned runtime waits for running searches
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs search jobs on blocking threads, at most `size` at a time
#[derive(Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on a worker thread and wait for it
    ///
    /// The pool slot is held until the job returns, even if the returned
    /// future is dropped first. A panicking job yields `SearchFailed`.
    pub async fn run<F, R>(&self, job: F) -> LocatorResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| LocatorError::Internal("worker pool closed".to_string()))?;

        self.handle
            .spawn_blocking(move || {
                let _permit = permit;
                job()
            })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    LocatorError::SearchFailed(format!(
                        "search panicked: {}",
                        panic_message(e.into_panic().as_ref())
                    ))
                } else {
                    LocatorError::Internal("search job aborted".to_string())
                }
            })
    }
}

/// Owns the async runtime that drives locates and the search worker pool
///
/// An executor built with [`AsyncExecutor::new`] owns its runtime and must be
/// dropped outside of any async context.
pub struct AsyncExecutor {
    runtime: Option<Runtime>,
    pool: WorkerPool,
}

impl AsyncExecutor {
    /// Build a dedicated runtime sized from configuration
    pub fn new(config: &ExecutorConfig) -> LocatorResult<Self> {
        let size = config.resolved_worker_threads();
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name(config.thread_name.clone())
            .enable_time()
            .build()
            .map_err(LocatorError::ExecutorBuild)?;

        info!(workers = size, "Started locate worker pool");
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            pool: WorkerPool::new(handle, size),
        })
    }

    /// Use an existing runtime; searches are still limited to `size` at a time
    pub fn from_handle(handle: Handle, size: usize) -> Self {
        Self {
            runtime: None,
            pool: WorkerPool::new(handle, size),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.pool.handle
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.pool.handle.spawn(future)
    }
}

impl WorkerPool {
    fn new(handle: Handle, size: usize) -> Self {
        let size = size.max(1);
        Self {
            handle,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            debug!("Shutting down locate worker pool");
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn executor(threads: usize) -> AsyncExecutor {
        AsyncExecutor::new(&ExecutorConfig {
            worker_threads: Some(threads),
            ..ExecutorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn runs_job_off_caller_thread() {
        let executor = executor(2);
        let pool = executor.pool().clone();
        let caller = thread::current().id();

        let ran_on = executor
            .handle()
            .block_on(pool.run(|| thread::current().id()))
            .unwrap();
        assert_ne!(ran_on, caller);
    }

    #[test]
    fn panic_maps_to_search_failed() {
        let executor = executor(1);
        let pool = executor.pool().clone();

        let result: LocatorResult<()> = executor
            .handle()
            .block_on(pool.run(|| panic!("terrain exploded")));

        match result {
            Err(LocatorError::SearchFailed(reason)) => assert!(reason.contains("terrain exploded")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn limits_concurrent_jobs() {
        let executor = executor(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<_> = (0..6)
            .map(|_| {
                let pool = executor.pool().clone();
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                executor.spawn(async move {
                    pool.run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect();

        executor.handle().block_on(async {
            for job in jobs {
                job.await.unwrap().unwrap();
            }
        });

        assert_eq!(executor.pool().size(), 2);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
