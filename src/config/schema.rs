//! Configuration schema for async-locator
//!
//! Configuration is stored at `~/.config/async-locator/config.toml`

use crate::task::OverlapPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Locate defaults
    pub locate: LocateConfig,

    /// Worker pool settings
    pub executor: ExecutorConfig,

    /// Tag resolution cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Defaults applied to every locate request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    /// Seconds before a locate gives up (0 disables the deadline)
    pub timeout_secs: u64,

    /// Search radius in chunks
    pub search_radius: u32,

    /// Skip chunks that were already generated
    pub skip_existing_chunks: bool,

    /// What happens when an owner starts a second locate
    pub overlap_policy: OverlapPolicy,
}

impl LocateConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            search_radius: 100,
            skip_existing_chunks: false,
            overlap_policy: OverlapPolicy::Reject,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of search threads (defaults to available parallelism)
    pub worker_threads: Option<usize>,

    /// Name given to worker threads
    pub thread_name: String,
}

impl ExecutorConfig {
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "locator-worker".to_string(),
        }
    }
}

/// Tag resolution cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a resolved tag stays cached
    pub ttl_secs: u64,

    /// Number of levels cached at once
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 4,
        }
    }
}
