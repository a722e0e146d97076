//! Locate request parameters

use crate::config::schema::LocateConfig;
use crate::world::BlockPos;
use std::time::Duration;

/// Where and how far to search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateRequest {
    pub origin: BlockPos,
    /// Search radius in chunks
    pub radius: u32,
    pub skip_existing_chunks: bool,
    /// Deadline for the whole search; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl LocateRequest {
    pub fn new(origin: BlockPos) -> Self {
        Self::from_config(origin, &LocateConfig::default())
    }

    pub fn from_config(origin: BlockPos, config: &LocateConfig) -> Self {
        Self {
            origin,
            radius: config.search_radius,
            skip_existing_chunks: config.skip_existing_chunks,
            timeout: config.timeout(),
        }
    }

    pub fn radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn skip_existing_chunks(mut self, skip: bool) -> Self {
        self.skip_existing_chunks = skip;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
