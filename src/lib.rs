//! Async Locator - off-thread structure search
//!
//! Runs expensive structure searches on a worker pool and replays their
//! outcomes on a single home thread, with timeouts, cancellation, and a
//! per-owner ongoing flag.

pub mod cache;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod executor;
pub mod locate;
pub mod task;
pub mod ui;
pub mod world;

pub use error::{LocatorError, LocatorResult};
pub use executor::{AsyncExecutor, HomeExecutor, HomeHandle};
pub use locate::{AsyncLocator, LocateHandler, LocateRequest};
pub use task::{LocateOutcome, LocateTask, OverlapPolicy, TaskRegistry, TaskState};
