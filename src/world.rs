//! Contracts with the host world
//!
//! The locator never owns world state. It reads a [`Level`] through a shared
//! handle and asks a [`StructureSearch`] implementation to do the scanning.

use crate::error::LocatorResult;
use crate::task::CancelToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Block coordinates inside a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk column containing this position
    pub const fn chunk(&self) -> (i32, i32) {
        (self.x >> 4, self.z >> 4)
    }

    /// Squared distance ignoring height
    pub fn horizontal_distance_sq(&self, other: &BlockPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Name of a registry tag grouping several targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagKey(String);

impl TagKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved members of a tag. Shared so cache hits are cheap to hand out.
pub type TargetSet<T> = Arc<Vec<T>>;

/// What a search is looking for
#[derive(Debug, Clone)]
pub enum SearchTargets<T> {
    /// Already resolved set of targets
    Set(TargetSet<T>),
    /// Unresolved tag; the search resolves it itself (slower path)
    Tag(TagKey),
}

impl<T> SearchTargets<T> {
    pub fn describe(&self) -> String {
        match self {
            Self::Set(set) => format!("{} targets", set.len()),
            Self::Tag(tag) => format!("tag {}", tag),
        }
    }
}

/// Parameters handed to the search capability
#[derive(Debug, Clone)]
pub struct SearchQuery<T> {
    pub targets: SearchTargets<T>,
    pub origin: BlockPos,
    /// Search radius in chunks
    pub radius: u32,
    pub skip_existing_chunks: bool,
}

/// A successful search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundLocation<T> {
    pub position: BlockPos,
    pub target: T,
}

/// A world instance that searches are scoped to
///
/// Levels are shared as `Arc<L>` and compared by identity, never by value.
pub trait Level: Send + Sync + 'static {
    /// The kind of thing searches look for (e.g. a structure type)
    type Target: Clone + fmt::Debug + Send + Sync + 'static;

    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Resolve a tag to its members. `Ok(None)` means the tag does not exist.
    fn resolve_tagged_set(&self, tag: &TagKey) -> LocatorResult<Option<TargetSet<Self::Target>>>;
}

/// The expensive, read-only spatial search
///
/// Runs on a worker thread. Implementations may poll `cancel` to stop early;
/// the result of a cancelled search is discarded anyway.
pub trait StructureSearch<L: Level>: Send + Sync + 'static {
    fn search(
        &self,
        level: &L,
        query: &SearchQuery<L::Target>,
        cancel: &CancelToken,
    ) -> LocatorResult<Option<FoundLocation<L::Target>>>;
}
