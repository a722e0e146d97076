//! The locate pipeline
//!
//! ```text
//! caller ─► TaskRegistry ─► AsyncLocator ─► worker pool (search, tag cache)
//!                                │
//!                    timeout::supervise races the deadline
//!                                │
//!                       LocateTask settles once
//!                                │
//!            CompletionMarshaler ─► home queue ─► LocateHandler
//! ```

mod locator;
mod marshal;
mod request;
pub mod timeout;

pub use locator::AsyncLocator;
pub use marshal::{CompletionMarshaler, LocateHandler};
pub use request::LocateRequest;
pub use timeout::{supervise, Supervised};
