//! Read-through policy cache.
//!
//! [`PolicyCache`] wraps any [`PolicyStore`] and remembers lookups, both hits
//! and misses, for a configurable time-to-live. Writes go straight to the
//! wrapped store and evict the written key, so a caller always observes its
//! own writes.
//!
//! # Example
//!
//! ```ignore
//! use arbor_policy::cache::PolicyCache;
//! use std::sync::Arc;
//! use time::Duration;
//!
//! let store = Arc::new(InMemoryPolicyStore::new());
//! let cache = Arc::new(PolicyCache::new(store, Duration::minutes(5)));
//! let evaluator = AccessEvaluator::new(cache.clone());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use arbor_core::{Resource, ResourceId};

use crate::StorageResult;
use crate::policy::Policy;
use crate::storage::PolicyStore;

// =============================================================================
// Cache Entries
// =============================================================================

/// The two independent keyspaces of a policy store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Resource(ResourceId),
    Type(String),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    policy: Option<Policy>,
    expires_at: OffsetDateTime,
}

impl CacheEntry {
    fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups forwarded to the wrapped store.
    pub misses: u64,
    /// Entries evicted by writes or explicit invalidation.
    pub invalidations: u64,
    /// Entries currently held.
    pub entries: usize,
}

// =============================================================================
// Policy Cache
// =============================================================================

/// Caching decorator over a [`PolicyStore`].
///
/// A non-positive TTL disables caching: every lookup reaches the store.
///
/// A lookup that overlaps a write is returned to its caller but not cached,
/// so the entry evicted by the write cannot be refilled with the old policy.
pub struct PolicyCache<S> {
    store: S,
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    /// Bumped by every write before the written key is evicted.
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl<S: PolicyStore> PolicyCache<S> {
    /// Create a cache in front of `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backing policy store
    /// * `ttl` - How long a cached lookup remains valid
    #[must_use]
    pub fn new(store: S, ttl: Duration) -> Self {
        Self {
            store,
            entries: DashMap::new(),
            ttl,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        let evicted = self.entries.len();
        self.entries.clear();
        self.invalidations.fetch_add(evicted as u64, Ordering::Relaxed);
        tracing::info!(evicted, "Policy cache cleared");
    }

    /// Drop the cached entry for one resource.
    pub fn invalidate_resource(&self, resource: &Resource) {
        self.invalidate(&CacheKey::Resource(resource.id().clone()));
    }

    /// Drop the cached entry for one data type.
    pub fn invalidate_type(&self, resource_type: &str) {
        self.invalidate(&CacheKey::Type(resource_type.to_string()));
    }

    /// Current counters.
    pub fn stats(&self) -> PolicyCacheStats {
        PolicyCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn invalidate(&self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(?key, "Policy cache entry invalidated");
        }
    }

    fn read_through<F>(&self, key: CacheKey, load: F) -> StorageResult<Option<Policy>>
    where
        F: FnOnce(&S) -> StorageResult<Option<Policy>>,
    {
        let now = OffsetDateTime::now_utc();

        if let Some(entry) = self.entries.get(&key)
            && entry.is_fresh(now)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(?key, "Policy cache hit");
            return Ok(entry.policy.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::SeqCst);
        let policy = load(&self.store)?;

        if self.ttl.is_positive() {
            // The shard lock held by `entry` orders this check against the
            // eviction that follows every generation bump.
            let slot = self.entries.entry(key);
            if self.generation.load(Ordering::SeqCst) == generation {
                slot.insert(CacheEntry {
                    policy: policy.clone(),
                    expires_at: now + self.ttl,
                });
            } else {
                tracing::trace!(key = ?slot.key(), "Skipping cache fill raced by a write");
            }
        }

        Ok(policy)
    }
}

impl<S: PolicyStore> PolicyStore for PolicyCache<S> {
    fn get_by_resource(&self, resource: &Resource) -> StorageResult<Option<Policy>> {
        self.read_through(CacheKey::Resource(resource.id().clone()), |store| {
            store.get_by_resource(resource)
        })
    }

    fn get_by_type(&self, resource_type: &str) -> StorageResult<Option<Policy>> {
        self.read_through(CacheKey::Type(resource_type.to_string()), |store| {
            store.get_by_type(resource_type)
        })
    }

    fn set_by_resource(&self, resource: &Resource, policy: Policy) -> StorageResult<Policy> {
        let stored = self.store.set_by_resource(resource, policy)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.invalidate_resource(resource);
        Ok(stored)
    }

    fn set_by_type(&self, resource_type: &str, policy: Policy) -> StorageResult<Policy> {
        let stored = self.store.set_by_type(resource_type, policy)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.invalidate_type(resource_type);
        Ok(stored)
    }
}

impl<S> std::fmt::Debug for PolicyCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use arbor_core::User;

    use super::*;
    use crate::storage::mock::MockPolicyStore;

    fn cache(ttl: Duration) -> PolicyCache<Arc<MockPolicyStore>> {
        PolicyCache::new(Arc::new(MockPolicyStore::new()), ttl)
    }

    #[test]
    fn test_hits_and_misses_are_cached() {
        let cache = cache(Duration::minutes(5));
        let data = Resource::system("/data");

        assert_eq!(cache.get_by_resource(&data).unwrap(), None);
        assert_eq!(cache.get_by_resource(&data).unwrap(), None);
        assert_eq!(cache.get_by_type("T").unwrap(), None);

        assert_eq!(cache.inner().read_count(), 2);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn test_write_invalidates_key() {
        let cache = cache(Duration::minutes(5));
        let data = Resource::system("/data");
        let policy = Policy::new(User::new("owner"));

        assert_eq!(cache.get_by_resource(&data).unwrap(), None);
        cache.set_by_resource(&data, policy.clone()).unwrap();

        assert_eq!(cache.get_by_resource(&data).unwrap(), Some(policy.clone()));
        assert_eq!(cache.stats().invalidations, 1);

        assert_eq!(cache.get_by_type("T").unwrap(), None);
        cache.set_by_type("T", policy.clone()).unwrap();
        assert_eq!(cache.get_by_type("T").unwrap(), Some(policy));
    }

    #[test]
    fn test_zero_ttl_disables_caching() {
        let cache = cache(Duration::ZERO);
        let data = Resource::system("/data");

        cache.get_by_resource(&data).unwrap();
        cache.get_by_resource(&data).unwrap();

        assert_eq!(cache.inner().read_count(), 2);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = cache(Duration::minutes(5));
        cache.get_by_resource(&Resource::system("/a")).unwrap();
        cache.get_by_type("T").unwrap();

        cache.invalidate_all();

        let stats = cache.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.invalidations, 2);

        cache.get_by_type("T").unwrap();
        assert_eq!(cache.inner().read_count(), 3);
    }

    /// Store whose first type lookup pauses after loading until released.
    struct GatedStore {
        inner: MockPolicyStore,
        armed: AtomicBool,
        loaded: Barrier,
        release: Barrier,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: MockPolicyStore::new(),
                armed: AtomicBool::new(true),
                loaded: Barrier::new(2),
                release: Barrier::new(2),
            }
        }
    }

    impl PolicyStore for GatedStore {
        fn get_by_resource(&self, resource: &Resource) -> StorageResult<Option<Policy>> {
            self.inner.get_by_resource(resource)
        }

        fn get_by_type(&self, resource_type: &str) -> StorageResult<Option<Policy>> {
            let policy = self.inner.get_by_type(resource_type);
            if self.armed.swap(false, Ordering::SeqCst) {
                self.loaded.wait();
                self.release.wait();
            }
            policy
        }

        fn set_by_resource(&self, resource: &Resource, policy: Policy) -> StorageResult<Policy> {
            self.inner.set_by_resource(resource, policy)
        }

        fn set_by_type(&self, resource_type: &str, policy: Policy) -> StorageResult<Policy> {
            self.inner.set_by_type(resource_type, policy)
        }
    }

    #[test]
    fn test_lookup_overlapping_a_write_is_not_cached() {
        let cache = PolicyCache::new(GatedStore::new(), Duration::minutes(5));
        let policy = Policy::new(User::new("owner"));

        thread::scope(|scope| {
            let reader = scope.spawn(|| cache.get_by_type("T").unwrap());

            cache.inner().loaded.wait();
            cache.set_by_type("T", policy.clone()).unwrap();
            cache.inner().release.wait();

            assert_eq!(reader.join().unwrap(), None);
        });

        assert_eq!(cache.inner().inner.get_by_type("T").unwrap(), Some(policy.clone()));
        assert_eq!(cache.get_by_type("T").unwrap(), Some(policy));
    }

    #[test]
    fn test_store_errors_are_not_cached() {
        let cache = PolicyCache::new(MockPolicyStore::failing(), Duration::minutes(5));
        assert!(cache.get_by_type("T").is_err());
        assert_eq!(cache.stats().entries, 0);
    }
}
