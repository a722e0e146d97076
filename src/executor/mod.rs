//! Execution contexts
//!
//! Two places run code:
//! - The home executor: one thread, FIFO, where every world mutation happens
//! - The worker pool: a fixed number of threads for expensive searches
//!
//! Nothing blocks the home thread waiting on a worker. Workers hand results
//! back by submitting closures to the home queue.

mod home;
mod worker;

pub use home::{HomeExecutor, HomeHandle, HomeLoop, HomeThunk};
pub use worker::{AsyncExecutor, WorkerPool};

use std::any::Any;

/// Best-effort text for a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
