//! Entry point that schedules searches and wires up their completion

use super::marshal::{CompletionMarshaler, LocateHandler};
use super::request::LocateRequest;
use super::timeout::{supervise, Supervised};
use crate::cache::WeakKeyedCache;
use crate::config::schema::{CacheConfig, LocateConfig};
use crate::config::Config;
use crate::error::{LocatorError, LocatorResult};
use crate::executor::{AsyncExecutor, HomeHandle, WorkerPool};
use crate::task::locate_task::TaskCore;
use crate::task::{CancelToken, LocateOutcome, LocateTask, TaskCanceller, TaskRegistry};
use crate::world::{
    BlockPos, FoundLocation, Level, SearchQuery, SearchTargets, StructureSearch, TagKey, TargetSet,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

type TagCache<L> = WeakKeyedCache<L, TargetSet<<L as Level>::Target>>;

/// Schedules searches on the worker pool and hands results back home
///
/// Cheap to share behind an `Arc`; every method may be called from any
/// thread, though callers normally issue locates from the home thread.
pub struct AsyncLocator<L: Level, S: StructureSearch<L>> {
    runtime: Handle,
    pool: WorkerPool,
    search: Arc<S>,
    home: HomeHandle,
    marshaler: CompletionMarshaler,
    tag_caches: Mutex<HashMap<TagKey, Arc<TagCache<L>>>>,
    cache_config: CacheConfig,
    defaults: LocateConfig,
}

impl<L: Level, S: StructureSearch<L>> AsyncLocator<L, S> {
    pub fn new(executor: &AsyncExecutor, search: S, home: HomeHandle, config: &Config) -> Self {
        let runtime = executor.handle().clone();
        Self {
            marshaler: CompletionMarshaler::new(runtime.clone()),
            runtime,
            pool: executor.pool().clone(),
            search: Arc::new(search),
            home,
            tag_caches: Mutex::new(HashMap::new()),
            cache_config: config.cache.clone(),
            defaults: config.locate.clone(),
        }
    }

    pub fn home_handle(&self) -> &HomeHandle {
        &self.home
    }

    /// A request from `origin` carrying the configured defaults
    pub fn request(&self, origin: BlockPos) -> LocateRequest {
        LocateRequest::from_config(origin, &self.defaults)
    }

    /// Start a search with no deadline
    pub fn locate(
        &self,
        level: &Arc<L>,
        targets: SearchTargets<L::Target>,
        origin: BlockPos,
        radius: u32,
        skip_existing_chunks: bool,
    ) -> LocateTask<L::Target> {
        let request = LocateRequest::new(origin)
            .radius(radius)
            .skip_existing_chunks(skip_existing_chunks)
            .timeout(None);
        self.locate_with(level, targets, &request)
    }

    /// Start a search for the members of `tag`
    ///
    /// The tag is resolved once per level and cached. When resolution fails
    /// the search receives the tag itself and resolves it the slow way.
    pub fn locate_tagged(
        &self,
        level: &Arc<L>,
        tag: TagKey,
        request: &LocateRequest,
    ) -> LocateTask<L::Target> {
        self.locate_with(level, SearchTargets::Tag(tag), request)
    }

    /// Start a search described by `request`. Returns immediately.
    pub fn locate_with(
        &self,
        level: &Arc<L>,
        targets: SearchTargets<L::Target>,
        request: &LocateRequest,
    ) -> LocateTask<L::Target> {
        let task = LocateTask::new(self.home.clone());
        let core = task.core();

        debug!(
            task = %core.id(),
            level = level.name(),
            targets = %targets.describe(),
            origin = %request.origin,
            radius = request.radius,
            "Scheduling locate"
        );

        let tag_cache = match &targets {
            SearchTargets::Tag(tag) => Some(self.tag_cache(tag)),
            SearchTargets::Set(_) => None,
        };
        let job = SearchJob {
            level: Arc::clone(level),
            search: Arc::clone(&self.search),
            tag_cache,
            query: SearchQuery {
                targets,
                origin: request.origin,
                radius: request.radius,
                skip_existing_chunks: request.skip_existing_chunks,
            },
            cancel: core.search_cancel().clone(),
        };

        self.runtime
            .spawn(drive(core, self.pool.clone(), job, request.timeout));
        task
    }

    /// Start a search on behalf of `token` and deliver the outcome to `handler`
    ///
    /// The token stays ongoing until the outcome reaches the home thread.
    /// A second call for an ongoing token is handled per the registry's
    /// overlap policy: rejected with `AlreadyOngoing`, or the running task is
    /// cancelled and replaced.
    pub fn locate_for<K, H>(
        &self,
        registry: &Arc<TaskRegistry<K>>,
        token: K,
        level: &Arc<L>,
        targets: SearchTargets<L::Target>,
        request: &LocateRequest,
        handler: H,
    ) -> LocatorResult<TaskCanceller>
    where
        K: Eq + Hash + Clone + Display + Send + 'static,
        H: LocateHandler<L::Target>,
    {
        let guard = registry
            .reserve(token.clone())
            .ok_or_else(|| LocatorError::AlreadyOngoing(token.to_string()))?;

        let task = self.locate_with(level, targets, request);
        let canceller = task.canceller();
        guard.bind(canceller.clone());
        self.marshaler.attach(task, handler, guard);
        Ok(canceller)
    }

    /// Resolution cache for `tag`, shared by every search for it
    pub fn tag_cache(&self, tag: &TagKey) -> Arc<TagCache<L>> {
        let mut caches = self
            .tag_caches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let cache = caches
            .entry(tag.clone())
            .or_insert_with(|| Arc::new(WeakKeyedCache::from_config(&self.cache_config)));
        Arc::clone(cache)
    }

    /// Forget every tag resolved for `level`, e.g. when it unloads
    pub fn invalidate_level(&self, level: &Arc<L>) -> usize {
        let caches = self
            .tag_caches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        caches
            .values()
            .filter(|cache| cache.invalidate(level))
            .count()
    }
}

/// Everything a worker needs to run one search
struct SearchJob<L: Level, S> {
    level: Arc<L>,
    search: Arc<S>,
    tag_cache: Option<Arc<TagCache<L>>>,
    query: SearchQuery<L::Target>,
    cancel: CancelToken,
}

impl<L: Level, S: StructureSearch<L>> SearchJob<L, S> {
    fn run(self) -> LocatorResult<Option<FoundLocation<L::Target>>> {
        let Self {
            level,
            search,
            tag_cache,
            mut query,
            cancel,
        } = self;

        if cancel.is_cancelled() {
            debug!("Locate cancelled before its search started");
            return Ok(None);
        }

        let resolved = match (&query.targets, &tag_cache) {
            (SearchTargets::Tag(tag), Some(cache)) => {
                let label = format!("tag {} in {}", tag, level.name());
                let set = cache.get_or_resolve(&level, &label, |level| level.resolve_tagged_set(tag));
                if set.is_none() {
                    debug!(%tag, "Falling back to tag search");
                }
                set
            }
            _ => None,
        };
        if let Some(set) = resolved {
            query.targets = SearchTargets::Set(set);
        }

        search.search(&level, &query, &cancel)
    }
}

async fn drive<L, S>(
    core: Arc<TaskCore<L::Target>>,
    pool: WorkerPool,
    job: SearchJob<L, S>,
    deadline: Option<Duration>,
) where
    L: Level,
    S: StructureSearch<L>,
{
    if core.state().is_terminal() {
        return;
    }

    let id = core.id();
    let search_cancel = core.search_cancel().clone();
    let supervised = supervise(pool.run(move || job.run()), deadline, || {
        search_cancel.cancel();
    })
    .await;

    let outcome = match supervised {
        Supervised::Completed(result) => match result.and_then(|searched| searched) {
            Ok(Some(found)) => LocateOutcome::Succeeded(found),
            Ok(None) => LocateOutcome::EmptyResult,
            Err(e) => {
                let e = match e {
                    LocatorError::SearchFailed(_) => e,
                    other => LocatorError::SearchFailed(other.to_string()),
                };
                debug!(task = %id, error = %e, "Search failed");
                LocateOutcome::Failed(e)
            }
        },
        Supervised::TimedOut(after) => {
            debug!(task = %id, after_secs = after.as_secs_f64(), "Deadline elapsed, search told to stop");
            LocateOutcome::TimedOut(after)
        }
    };

    core.settle(outcome);
}
