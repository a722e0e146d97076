//! In-memory world used by the CLI and tests
//!
//! [`DemoLevel`] holds placed structures and registry tags, [`RingSearch`]
//! scans chunk rings outward from the origin, and [`DemoEye`] is an owner
//! that flies towards whatever was found.

use crate::error::{LocatorError, LocatorResult};
use crate::locate::LocateHandler;
use crate::task::CancelToken;
use crate::world::{
    BlockPos, FoundLocation, Level, SearchQuery, SearchTargets, StructureSearch, TagKey, TargetSet,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Tag an eye of ender searches for
pub const EYE_OF_ENDER_LOCATED: &str = "eye_of_ender_located";

/// A structure placed in a [`DemoLevel`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedStructure {
    pub kind: String,
    pub position: BlockPos,
}

/// A level with a fixed set of structures
pub struct DemoLevel {
    name: String,
    structures: HashMap<(i32, i32), Vec<PlacedStructure>>,
    tags: HashMap<TagKey, Vec<String>>,
    explored: HashSet<(i32, i32)>,
    broken_registry: bool,
}

impl DemoLevel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            structures: HashMap::new(),
            tags: HashMap::new(),
            explored: HashSet::new(),
            broken_registry: false,
        }
    }

    /// An overworld with a stronghold and a couple of villages
    pub fn sample() -> Self {
        Self::new("overworld")
            .with_structure("stronghold", BlockPos::new(500, 64, -300))
            .with_structure("village_plains", BlockPos::new(-120, 70, 88))
            .with_structure("village_desert", BlockPos::new(900, 68, 900))
            .with_tag(EYE_OF_ENDER_LOCATED, ["stronghold"])
            .with_tag("village", ["village_plains", "village_desert"])
    }

    pub fn with_structure(mut self, kind: impl Into<String>, position: BlockPos) -> Self {
        self.structures
            .entry(position.chunk())
            .or_default()
            .push(PlacedStructure {
                kind: kind.into(),
                position,
            });
        self
    }

    pub fn with_tag<I, S>(mut self, tag: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(TagKey::new(tag), members.into_iter().map(Into::into).collect());
        self
    }

    /// Mark a chunk as already generated
    pub fn with_explored_chunk(mut self, chunk: (i32, i32)) -> Self {
        self.explored.insert(chunk);
        self
    }

    /// Make every registry lookup fail, forcing the tag fallback path
    pub fn with_broken_registry(mut self, broken: bool) -> Self {
        self.broken_registry = broken;
        self
    }

    pub fn is_explored(&self, chunk: (i32, i32)) -> bool {
        self.explored.contains(&chunk)
    }

    pub fn structures_in(&self, chunk: (i32, i32)) -> &[PlacedStructure] {
        self.structures.get(&chunk).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tag members read straight from level data, bypassing the registry
    pub fn tag_members(&self, tag: &TagKey) -> Option<&[String]> {
        self.tags.get(tag).map(Vec::as_slice)
    }
}

impl Level for DemoLevel {
    type Target = String;

    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_tagged_set(&self, tag: &TagKey) -> LocatorResult<Option<TargetSet<String>>> {
        if self.broken_registry {
            return Err(LocatorError::lookup(tag.as_str(), "structure registry unavailable"));
        }
        Ok(self.tag_members(tag).map(|members| Arc::new(members.to_vec())))
    }
}

/// Scans square chunk rings around the origin, nearest ring first
#[derive(Debug, Clone, Default)]
pub struct RingSearch {
    /// Simulated cost of scanning one ring
    pub ring_delay: Duration,
}

impl RingSearch {
    pub fn new(ring_delay: Duration) -> Self {
        Self { ring_delay }
    }

    fn nearest_in_ring(
        &self,
        level: &DemoLevel,
        query: &SearchQuery<String>,
        targets: &[String],
        ring: i32,
    ) -> Option<PlacedStructure> {
        let (cx, cz) = query.origin.chunk();
        let mut best: Option<(i64, &PlacedStructure)> = None;

        for dx in -ring..=ring {
            for dz in -ring..=ring {
                if dx.abs() != ring && dz.abs() != ring {
                    continue;
                }
                let chunk = (cx + dx, cz + dz);
                if query.skip_existing_chunks && level.is_explored(chunk) {
                    continue;
                }
                for placed in level.structures_in(chunk) {
                    if !targets.contains(&placed.kind) {
                        continue;
                    }
                    let distance = placed.position.horizontal_distance_sq(&query.origin);
                    if best.map_or(true, |(d, _)| distance < d) {
                        best = Some((distance, placed));
                    }
                }
            }
        }

        best.map(|(_, placed)| placed.clone())
    }
}

impl StructureSearch<DemoLevel> for RingSearch {
    fn search(
        &self,
        level: &DemoLevel,
        query: &SearchQuery<String>,
        cancel: &CancelToken,
    ) -> LocatorResult<Option<FoundLocation<String>>> {
        let targets: Vec<String> = match &query.targets {
            SearchTargets::Set(set) => set.as_ref().clone(),
            SearchTargets::Tag(tag) => match level.tag_members(tag) {
                Some(members) => members.to_vec(),
                None => {
                    debug!(%tag, "Unknown tag, nothing to search for");
                    return Ok(None);
                }
            },
        };

        let radius = i32::try_from(query.radius).unwrap_or(i32::MAX);
        for ring in 0..=radius {
            if cancel.is_cancelled() {
                debug!(ring, "Search cancelled");
                return Ok(None);
            }

            if let Some(placed) = self.nearest_in_ring(level, query, &targets, ring) {
                return Ok(Some(FoundLocation {
                    position: placed.position,
                    target: placed.kind,
                }));
            }

            trace!(ring, "Ring empty");
            if !self.ring_delay.is_zero() {
                thread::sleep(self.ring_delay);
            }
        }

        Ok(None)
    }
}

/// Observable state of a [`DemoEye`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EyeState {
    pub alive: bool,
    pub signalled_to: Option<BlockPos>,
    pub target: Option<String>,
    pub discarded: bool,
    pub dropped_item: bool,
    pub failure: Option<String>,
    pub uses: u32,
}

impl Default for EyeState {
    fn default() -> Self {
        Self {
            alive: true,
            signalled_to: None,
            target: None,
            discarded: false,
            dropped_item: false,
            failure: None,
            uses: 0,
        }
    }
}

/// A thrown eye of ender waiting for a locate result
///
/// Clones share state, so one clone can be handed to the locator while
/// another is inspected or removed.
#[derive(Debug, Clone, Default)]
pub struct DemoEye {
    state: Arc<Mutex<EyeState>>,
    stuck: bool,
}

impl DemoEye {
    pub fn new() -> Self {
        Self::default()
    }

    /// An eye that cannot be moved; signalling it fails
    pub fn stuck() -> Self {
        Self {
            stuck: true,
            ..Self::default()
        }
    }

    pub fn state(&self) -> EyeState {
        self.lock().clone()
    }

    /// Unload the eye, e.g. because its chunk unloaded
    pub fn remove(&self) {
        self.lock().alive = false;
    }

    fn discard(state: &mut EyeState) {
        state.discarded = true;
        state.alive = false;
    }

    fn lock(&self) -> MutexGuard<'_, EyeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocateHandler<String> for DemoEye {
    fn is_live(&self) -> bool {
        self.lock().alive
    }

    fn on_found(&mut self, found: FoundLocation<String>) -> LocatorResult<()> {
        let mut state = self.lock();
        state.uses += 1;
        if self.stuck {
            return Err(LocatorError::Internal("eye is stuck in a block".to_string()));
        }
        state.signalled_to = Some(found.position);
        state.target = Some(found.target);
        Ok(())
    }

    fn on_empty(&mut self) {
        Self::discard(&mut self.lock());
    }

    fn on_failed(&mut self, error: &LocatorError) {
        let mut state = self.lock();
        state.failure = Some(error.to_string());
        Self::discard(&mut state);
    }

    fn on_timed_out(&mut self, _after: Duration) {
        let mut state = self.lock();
        state.dropped_item = true;
        Self::discard(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(targets: &[&str], origin: BlockPos, radius: u32) -> SearchQuery<String> {
        SearchQuery {
            targets: SearchTargets::Set(Arc::new(targets.iter().map(|t| t.to_string()).collect())),
            origin,
            radius,
            skip_existing_chunks: false,
        }
    }

    #[test]
    fn ring_search_finds_stronghold() {
        let level = DemoLevel::sample();
        let found = RingSearch::default()
            .search(
                &level,
                &query(&["stronghold"], BlockPos::new(0, 0, 0), 100),
                &CancelToken::new(),
            )
            .unwrap()
            .unwrap();

        assert_eq!(found.position, BlockPos::new(500, 64, -300));
        assert_eq!(found.target, "stronghold");
    }

    #[test]
    fn ring_search_prefers_nearest_ring() {
        let level = DemoLevel::sample();
        let found = RingSearch::default()
            .search(
                &level,
                &query(&["village_plains", "village_desert"], BlockPos::new(0, 0, 0), 100),
                &CancelToken::new(),
            )
            .unwrap()
            .unwrap();

        assert_eq!(found.target, "village_plains");
    }

    #[test]
    fn ring_search_respects_radius() {
        let level = DemoLevel::sample();
        // Stronghold sits 31 chunks out
        let found = RingSearch::default()
            .search(
                &level,
                &query(&["stronghold"], BlockPos::new(0, 0, 0), 30),
                &CancelToken::new(),
            )
            .unwrap();

        assert!(found.is_none());
    }

    #[test]
    fn ring_search_skips_explored_chunks() {
        let level = DemoLevel::sample().with_explored_chunk((31, -19));
        let mut q = query(&["stronghold"], BlockPos::new(0, 0, 0), 100);
        q.skip_existing_chunks = true;

        let found = RingSearch::default()
            .search(&level, &q, &CancelToken::new())
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn ring_search_stops_when_cancelled() {
        let level = DemoLevel::sample();
        let cancel = CancelToken::new();
        cancel.cancel();

        let found = RingSearch::default()
            .search(&level, &query(&["stronghold"], BlockPos::new(0, 0, 0), 100), &cancel)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn tag_path_reads_level_data() {
        let level = DemoLevel::sample().with_broken_registry(true);
        assert!(level
            .resolve_tagged_set(&TagKey::new(EYE_OF_ENDER_LOCATED))
            .is_err());

        let q = SearchQuery {
            targets: SearchTargets::Tag(TagKey::new(EYE_OF_ENDER_LOCATED)),
            origin: BlockPos::new(0, 0, 0),
            radius: 100,
            skip_existing_chunks: false,
        };
        let found = RingSearch::default()
            .search(&level, &q, &CancelToken::new())
            .unwrap();
        assert_eq!(found.map(|f| f.target), Some("stronghold".to_string()));
    }

    #[test]
    fn eye_reacts_to_each_outcome() {
        let mut eye = DemoEye::new();
        eye.on_found(FoundLocation {
            position: BlockPos::new(1, 2, 3),
            target: "stronghold".to_string(),
        })
        .unwrap();
        let state = eye.state();
        assert_eq!(state.signalled_to, Some(BlockPos::new(1, 2, 3)));
        assert_eq!(state.uses, 1);
        assert!(state.alive);

        let mut eye = DemoEye::new();
        eye.on_empty();
        assert!(eye.state().discarded);
        assert!(!eye.is_live());

        let mut eye = DemoEye::new();
        eye.on_timed_out(Duration::from_secs(20));
        let state = eye.state();
        assert!(state.dropped_item && state.discarded);

        let mut eye = DemoEye::new();
        eye.on_failed(&LocatorError::SearchFailed("boom".to_string()));
        assert_eq!(eye.state().failure.as_deref(), Some("Search failed: boom"));
    }

    #[test]
    fn stuck_eye_fails_to_signal() {
        let mut eye = DemoEye::stuck();
        let result = eye.on_found(FoundLocation {
            position: BlockPos::new(1, 2, 3),
            target: "stronghold".to_string(),
        });

        assert!(result.is_err());
        assert_eq!(eye.state().signalled_to, None);
        assert_eq!(eye.state().uses, 1);
    }

    #[test]
    fn removed_eye_is_not_live() {
        let eye = DemoEye::new();
        let shared = eye.clone();
        shared.remove();
        assert!(!eye.is_live());
    }
}
