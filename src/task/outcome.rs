//! Terminal outcomes of a locate task

use crate::error::LocatorError;
use crate::world::FoundLocation;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a locate task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskState {
    Pending = 0,
    Succeeded = 1,
    EmptyResult = 2,
    Failed = 3,
    TimedOut = 4,
    Cancelled = 5,
}

impl TaskState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Succeeded,
            2 => Self::EmptyResult,
            3 => Self::Failed,
            4 => Self::TimedOut,
            5 => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::EmptyResult => "empty",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// The single result a locate task settles with
#[derive(Debug)]
pub enum LocateOutcome<T> {
    Succeeded(FoundLocation<T>),
    EmptyResult,
    Failed(LocatorError),
    TimedOut(Duration),
    Cancelled,
}

impl<T> LocateOutcome<T> {
    pub fn state(&self) -> TaskState {
        match self {
            Self::Succeeded(_) => TaskState::Succeeded,
            Self::EmptyResult => TaskState::EmptyResult,
            Self::Failed(_) => TaskState::Failed,
            Self::TimedOut(_) => TaskState::TimedOut,
            Self::Cancelled => TaskState::Cancelled,
        }
    }

    /// The found location, if the search succeeded
    pub fn found(&self) -> Option<&FoundLocation<T>> {
        match self {
            Self::Succeeded(found) => Some(found),
            _ => None,
        }
    }
}
