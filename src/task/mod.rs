//! Locate task lifecycle
//!
//! A [`LocateTask`] is the caller's handle on one asynchronous search. It
//! settles exactly once into one of five terminal states:
//!
//! | State | Meaning |
//! |-------|---------|
//! | Succeeded | Search found a target |
//! | EmptyResult | Search completed without a match |
//! | Failed | Search raised an error or panicked |
//! | TimedOut | Deadline elapsed before the search finished |
//! | Cancelled | Caller cancelled before settlement |
//!
//! The [`TaskRegistry`] keeps one ongoing task per owner token.

pub mod cancel;
pub mod locate_task;
pub mod outcome;
pub mod registry;

pub use cancel::CancelToken;
pub use locate_task::{LocateTask, TaskCanceller, TaskId};
pub use outcome::{LocateOutcome, TaskState};
pub use registry::{OngoingGuard, OverlapPolicy, TaskRegistry};
