//! Error types for async-locator
//!
//! All modules use `LocatorResult<T>` as their return type.

use crate::world::BlockPos;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for locator operations
pub type LocatorResult<T> = Result<T, LocatorError>;

/// All errors that can occur while locating
#[derive(Error, Debug)]
pub enum LocatorError {
    // Lookup errors
    #[error("Tag lookup unavailable for {tag}: {reason}")]
    LookupUnavailable { tag: String, reason: String },

    // Search errors
    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Locate timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to signal owner to {position}: {reason}")]
    SignalFailed { position: BlockPos, reason: String },

    // Task errors
    #[error("Locate already ongoing for {0}")]
    AlreadyOngoing(String),

    #[error("Home executor is closed")]
    HomeExecutorClosed,

    #[error("Failed to build worker runtime: {0}")]
    ExecutorBuild(#[source] std::io::Error),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl LocatorError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a lookup error for a tag
    pub fn lookup(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LookupUnavailable {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Check if a fresh locate attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::LookupUnavailable { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout(_) => Some("Raise locate.timeout_secs or lower locate.search_radius"),
            Self::AlreadyOngoing(_) => Some("Wait for the running locate to finish"),
            Self::ConfigInvalid { .. } => Some("Run: async-locator config init --force"),
            _ => None,
        }
    }
}
