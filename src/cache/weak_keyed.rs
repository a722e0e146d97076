//! Identity-keyed cache holding weak references to its keys

use crate::config::schema::CacheConfig;
use crate::error::LocatorResult;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, warn};

/// One cached value for one context instance
struct CacheEntry<C, V> {
    context: Weak<C>,
    value: V,
    inserted_at: DateTime<Utc>,
}

impl<C, V> CacheEntry<C, V> {
    fn matches(&self, context: &Arc<C>) -> bool {
        // The weak reference pins the allocation, so the address cannot be
        // reused by a new context while this entry exists.
        self.context.strong_count() > 0 && std::ptr::eq(self.context.as_ptr(), Arc::as_ptr(context))
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        // An expiry past the end of representable time never arrives
        self.inserted_at
            .checked_add_signed(ttl)
            .is_some_and(|expires_at| now >= expires_at)
    }
}

/// Bounded cache from a context handle to a derived value
///
/// Safe to share across worker threads. Every operation holds the lock for a
/// scan over at most `capacity` entries.
pub struct WeakKeyedCache<C, V> {
    entries: Mutex<Vec<CacheEntry<C, V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<C, V: Clone> WeakKeyedCache<C, V> {
    /// Create a cache with the given entry lifetime and capacity
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity.max(1))),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Create a cache from configuration
    ///
    /// A TTL too large for `chrono` saturates instead of failing.
    pub fn from_config(config: &CacheConfig) -> Self {
        let secs = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX);
        let ttl = Duration::try_seconds(secs).unwrap_or(Duration::MAX);
        Self::new(ttl, config.max_entries)
    }

    /// Get the cached value for `context` if it is still current
    pub fn get(&self, context: &Arc<C>) -> Option<V> {
        let mut entries = self.lock();
        self.purge(&mut entries, Utc::now());
        entries
            .iter()
            .find(|entry| entry.matches(context))
            .map(|entry| entry.value.clone())
    }

    /// Store a value for `context`, replacing any previous one
    pub fn put(&self, context: &Arc<C>, value: V) {
        let mut entries = self.lock();
        self.purge(&mut entries, Utc::now());
        entries.retain(|entry| !entry.matches(context));

        if entries.len() >= self.capacity {
            // Entries are kept in insertion order
            entries.remove(0);
        }

        entries.push(CacheEntry {
            context: Arc::downgrade(context),
            value,
            inserted_at: Utc::now(),
        });
    }

    /// Return the cached value or compute and store it
    ///
    /// `resolve` runs outside the lock. `Ok(None)` and `Err` both leave the
    /// cache untouched and return `None`, so the caller can take its slower
    /// path.
    pub fn get_or_resolve<F>(&self, context: &Arc<C>, label: &str, resolve: F) -> Option<V>
    where
        F: FnOnce(&C) -> LocatorResult<Option<V>>,
    {
        if let Some(value) = self.get(context) {
            debug!("Using cached {}", label);
            return Some(value);
        }

        match resolve(context.as_ref()) {
            Ok(Some(value)) => {
                self.put(context, value.clone());
                debug!("Cached {}", label);
                Some(value)
            }
            Ok(None) => {
                warn!("{} not found, nothing cached", label);
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve {}", label);
                None
            }
        }
    }

    /// Drop the entry for `context`, if any
    pub fn invalidate(&self, context: &Arc<C>) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|entry| !entry.matches(context));
        before != entries.len()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of live, unexpired entries
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        self.purge(&mut entries, Utc::now());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(&self, entries: &mut Vec<CacheEntry<C, V>>, now: DateTime<Utc>) {
        entries.retain(|entry| entry.context.strong_count() > 0 && !entry.is_expired(self.ttl, now));
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CacheEntry<C, V>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocatorError;

    #[derive(Debug, PartialEq)]
    struct Ctx(&'static str);

    fn cache() -> WeakKeyedCache<Ctx, u32> {
        WeakKeyedCache::new(Duration::minutes(5), 4)
    }

    #[test]
    fn put_then_get_returns_value() {
        let cache = cache();
        let ctx = Arc::new(Ctx("overworld"));

        cache.put(&ctx, 7);
        assert_eq!(cache.get(&ctx), Some(7));
    }

    #[test]
    fn equal_but_distinct_context_misses() {
        let cache = cache();
        let ctx = Arc::new(Ctx("overworld"));
        let twin = Arc::new(Ctx("overworld"));
        assert_eq!(*ctx, *twin);

        cache.put(&ctx, 7);
        assert_eq!(cache.get(&twin), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = cache();
        let ctx = Arc::new(Ctx("overworld"));

        cache.put(&ctx, 7);
        assert!(cache.invalidate(&ctx));
        assert_eq!(cache.get(&ctx), None);
        assert!(!cache.invalidate(&ctx));
    }

    #[test]
    fn does_not_keep_context_alive() {
        let cache = cache();
        let ctx = Arc::new(Ctx("nether"));
        let weak = Arc::downgrade(&ctx);

        cache.put(&ctx, 1);
        drop(ctx);

        assert!(weak.upgrade().is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expired_entry_misses() {
        let cache: WeakKeyedCache<Ctx, u32> = WeakKeyedCache::new(Duration::zero(), 4);
        let ctx = Arc::new(Ctx("end"));

        cache.put(&ctx, 3);
        assert_eq!(cache.get(&ctx), None);
    }

    #[test]
    fn oldest_entry_evicted_at_capacity() {
        let cache: WeakKeyedCache<Ctx, u32> = WeakKeyedCache::new(Duration::minutes(5), 2);
        let a = Arc::new(Ctx("a"));
        let b = Arc::new(Ctx("b"));
        let c = Arc::new(Ctx("c"));

        cache.put(&a, 1);
        cache.put(&b, 2);
        cache.put(&c, 3);

        assert_eq!(cache.get(&a), None);
        assert_eq!(cache.get(&b), Some(2));
        assert_eq!(cache.get(&c), Some(3));
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = cache();
        let ctx = Arc::new(Ctx("overworld"));

        cache.put(&ctx, 1);
        cache.put(&ctx, 2);
        assert_eq!(cache.get(&ctx), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_resolve_is_not_cached() {
        let cache = cache();
        let ctx = Arc::new(Ctx("overworld"));

        let first = cache.get_or_resolve(&ctx, "test set", |_| {
            Err(LocatorError::lookup("test", "registry missing"))
        });
        assert_eq!(first, None);
        assert!(cache.is_empty());

        let missing = cache.get_or_resolve(&ctx, "test set", |_| Ok(None));
        assert_eq!(missing, None);
        assert!(cache.is_empty());

        let resolved = cache.get_or_resolve(&ctx, "test set", |_| Ok(Some(9)));
        assert_eq!(resolved, Some(9));

        let cached = cache.get_or_resolve(&ctx, "test set", |_| -> LocatorResult<Option<u32>> {
            panic!("should hit the cache")
        });
        assert_eq!(cached, Some(9));
    }

    #[test]
    fn huge_ttl_saturates_and_keeps_entries() {
        for ttl_secs in [9_000_000_000_000, 10_000_000_000_000_000, u64::MAX] {
            let cache: WeakKeyedCache<Ctx, u32> = WeakKeyedCache::from_config(&CacheConfig {
                ttl_secs,
                max_entries: 4,
            });
            let ctx = Arc::new(Ctx("overworld"));

            cache.put(&ctx, 5);
            assert_eq!(cache.get(&ctx), Some(5), "ttl_secs = {}", ttl_secs);
            assert_eq!(cache.len(), 1);
        }
    }
}
