//! The coherent read-side cache.
//!
//! A single `moka` cache holds every entity kind and namespace. Values are
//! stored type-erased with their own TTL, and reads downcast back to the
//! caller's type. A value of the wrong type is treated as a miss and
//! dropped, never surfaced as an error.
//!
//! Read-through fills are guarded by a write generation: a loader takes a
//! [`FillTicket`] before hitting the store, and its result is only cached
//! if no invalidation happened in between. Without that, a slow read could
//! repopulate a key with a value from before a concurrent write.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;
use serde::Serialize;
use tracing::{debug, warn};

use super::keys::{CacheKey, EntityKind, KeyPrefix};
use super::policy::{plan_invalidation, Affected, TtlPolicy};
use crate::domain::errors::DomainResult;
use crate::domain::models::CacheConfig;

#[derive(Clone)]
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Send + Sync + 'static>(value: T, ttl: Duration) -> Self {
        Self {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn decode<T: Clone + 'static>(&self) -> Result<T, CacheError> {
        self.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(CacheError::Decode {
                expected: std::any::type_name::<T>(),
            })
    }
}

/// Faults inside the cache. Never leaves this module: every one degrades
/// to a miss.
#[derive(Debug, thiserror::Error)]
enum CacheError {
    #[error("cached value is not a {expected}")]
    Decode { expected: &'static str },
}

/// Each entry lives for the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Proof that a read-through started at a given write generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

/// Point-in-time counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub decode_failures: u64,
    pub invalidations: u64,
    pub fills_discarded: u64,
    pub entries: u64,
}

impl CacheMetrics {
    /// Hits over lookups, 0.0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decode_failures: AtomicU64,
    invalidations: AtomicU64,
    fills_discarded: AtomicU64,
}

/// Shared cache for users, skins and transactions.
pub struct CoherentCache {
    entries: Cache<String, CacheEntry>,
    ttl: TtlPolicy,
    generation: AtomicU64,
    counters: Counters,
}

impl CoherentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_policy(config.max_capacity, TtlPolicy::from_config(config))
    }

    pub fn with_policy(max_capacity: u64, ttl: TtlPolicy) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .support_invalidation_closures()
            .build();

        Self {
            entries,
            ttl,
            generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Look up `key` as a `T`.
    ///
    /// Expired entries and entries holding another type count as misses and
    /// are removed.
    pub async fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let Some(entry) = self.entries.get(key.as_str()).await else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss");
            return None;
        };

        if entry.is_expired() {
            self.entries.invalidate(key.as_str()).await;
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        match entry.decode::<T>() {
            Ok(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                self.entries.invalidate(key.as_str()).await;
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Unconditional write with an explicit TTL.
    pub async fn set<T>(&self, key: &CacheKey, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        if ttl.is_zero() {
            return;
        }
        self.entries
            .insert(key.as_str().to_string(), CacheEntry::new(value, ttl))
            .await;
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache set");
    }

    /// Unconditional write using the TTL of the key's namespace.
    pub async fn put<T>(&self, key: &CacheKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        let ttl = self.ttl.ttl_for(key.namespace());
        self.set(key, value, ttl).await;
    }

    /// Remove one key.
    pub async fn delete(&self, key: &CacheKey) {
        self.bump_generation();
        self.entries.invalidate(key.as_str()).await;
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache key invalidated");
    }

    /// Remove every key in the family `prefix`.
    pub fn evict_prefix(&self, prefix: &KeyPrefix) {
        self.bump_generation();
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);

        let family = prefix.clone();
        if let Err(e) = self
            .entries
            .invalidate_entries_if(move |key, _| family.matches(key))
        {
            warn!(prefix = %prefix, error = %e, "Prefix eviction unavailable, clearing cache");
            self.entries.invalidate_all();
            return;
        }
        debug!(prefix = %prefix, "Cache family invalidated");
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.bump_generation();
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        self.entries.invalidate_all();
    }

    /// Apply the invalidation rules for a write to `kind`.
    pub async fn invalidate_for_write(&self, kind: EntityKind, affected: &Affected) {
        let plan = plan_invalidation(kind, affected);
        debug!(
            entity = kind.as_str(),
            keys = plan.keys.len(),
            families = plan.prefixes.len(),
            "Invalidating cache after write"
        );
        for key in &plan.keys {
            self.delete(key).await;
        }
        for prefix in &plan.prefixes {
            self.evict_prefix(prefix);
        }
    }

    /// Start a read-through. Take the ticket before reading the store.
    pub fn fill_ticket(&self) -> FillTicket {
        FillTicket(self.generation.load(Ordering::Acquire))
    }

    /// Cache a loaded value unless a write happened since `ticket` was taken.
    ///
    /// Returns whether the value was kept.
    pub async fn fill<T>(&self, ticket: FillTicket, key: &CacheKey, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        if !self.is_current(ticket) {
            self.discard_fill(key);
            return false;
        }

        self.put(key, value).await;

        // A write may have slipped in between the check and the insert.
        if !self.is_current(ticket) {
            self.entries.invalidate(key.as_str()).await;
            self.discard_fill(key);
            return false;
        }
        true
    }

    /// Return the cached `T` under `key`, or run `load` and fill the result.
    ///
    /// Errors from `load` are returned as-is and never cached.
    pub async fn get_or_load<T, F, Fut>(&self, key: &CacheKey, load: F) -> DomainResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }
        let ticket = self.fill_ticket();
        let value = load().await?;
        self.fill(ticket, key, value.clone()).await;
        Ok(value)
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            fills_discarded: self.counters.fills_discarded.load(Ordering::Relaxed),
            entries: self.entries.entry_count(),
        }
    }

    /// Approximate live entry count, after flushing moka's pending work.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn is_current(&self, ticket: FillTicket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.0
    }

    fn discard_fill(&self, key: &CacheKey) {
        self.counters.fills_discarded.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Discarding stale cache fill");
    }
}

impl Default for CoherentCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::keys;
    use crate::domain::errors::DomainError;
    use crate::domain::models::{Page, Skin, User};
    use crate::domain::ports::SkinFilter;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = CoherentCache::default();
        let user = User::new("alice", "alice@example.com");
        let key = keys::user_record(user.id);

        cache.put(&key, user.clone()).await;
        let cached: Option<User> = cache.get(&key).await;
        assert_eq!(cached.map(|u| u.id), Some(user.id));
        assert_eq!(cache.metrics().hits, 1);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = CoherentCache::default();
        let key = keys::user_balance(Uuid::new_v4());
        cache.put(&key, "not a number".to_string()).await;

        let balance: Option<f64> = cache.get(&key).await;
        assert!(balance.is_none());

        let metrics = cache.metrics();
        assert_eq!(metrics.decode_failures, 1);
        assert_eq!(metrics.misses, 1);

        // The bad entry is gone.
        let again: Option<String> = cache.get(&key).await;
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = CoherentCache::default();
        let key = keys::user_balance(Uuid::new_v4());
        cache.set(&key, 42.0_f64, Duration::from_millis(50)).await;

        assert_eq!(cache.get::<f64>(&key).await, Some(42.0));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get::<f64>(&key).await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_cached() {
        let cache = CoherentCache::default();
        let key = keys::user_balance(Uuid::new_v4());
        cache.set(&key, 1.0_f64, Duration::ZERO).await;
        assert_eq!(cache.get::<f64>(&key).await, None);
    }

    #[tokio::test]
    async fn test_delete_removes_key() {
        let cache = CoherentCache::default();
        let key = keys::skin_record(Uuid::new_v4());
        cache.put(&key, Skin::new("AK-47 | Redline", 12.5)).await;

        cache.delete(&key).await;
        assert!(cache.get::<Skin>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_evict_prefix_only_hits_family() {
        let cache = CoherentCache::default();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let first = keys::skin_list(SkinFilter::owned_by(owner), Page::new(10, 0));
        let second = keys::skin_list(SkinFilter::owned_by(owner), Page::new(10, 10));
        let unrelated = keys::skin_list(SkinFilter::owned_by(other), Page::new(10, 0));

        for key in [&first, &second, &unrelated] {
            cache.put(key, Vec::<Skin>::new()).await;
        }

        cache.evict_prefix(&keys::skin_lists_for_owner(owner));

        assert!(cache.get::<Vec<Skin>>(&first).await.is_none());
        assert!(cache.get::<Vec<Skin>>(&second).await.is_none());
        assert!(cache.get::<Vec<Skin>>(&unrelated).await.is_some());
    }

    #[tokio::test]
    async fn test_fill_is_discarded_after_concurrent_write() {
        let cache = CoherentCache::default();
        let id = Uuid::new_v4();
        let key = keys::user_balance(id);

        let ticket = cache.fill_ticket();
        // A writer invalidates while the loader is still reading.
        cache.delete(&key).await;
        let kept = cache.fill(ticket, &key, 100.0_f64).await;

        assert!(!kept);
        assert!(cache.get::<f64>(&key).await.is_none());
        assert_eq!(cache.metrics().fills_discarded, 1);
    }

    #[tokio::test]
    async fn test_fill_kept_without_concurrent_write() {
        let cache = CoherentCache::default();
        let key = keys::user_balance(Uuid::new_v4());
        let ticket = cache.fill_ticket();
        assert!(cache.fill(ticket, &key, 7.0_f64).await);
        assert_eq!(cache.get::<f64>(&key).await, Some(7.0));
    }

    #[tokio::test]
    async fn test_get_or_load_does_not_cache_errors() {
        let cache = CoherentCache::default();
        let id = Uuid::new_v4();
        let key = keys::user_record(id);

        let result: DomainResult<User> = cache
            .get_or_load(&key, || async move { Err(DomainError::UserNotFound(id)) })
            .await;
        assert!(matches!(result, Err(DomainError::UserNotFound(_))));
        assert!(cache.get::<User>(&key).await.is_none());

        let loaded = cache
            .get_or_load(&key, || async { Ok(User::new("bob", "bob@example.com")) })
            .await
            .unwrap();
        let cached: User = cache.get(&key).await.unwrap();
        assert_eq!(cached.id, loaded.id);
    }

    #[tokio::test]
    async fn test_invalidate_for_write_clears_stats_family() {
        let cache = CoherentCache::default();
        let stats_key = keys::transaction_stats(Default::default());
        cache.put(&stats_key, 1_u64).await;

        cache
            .invalidate_for_write(EntityKind::Transaction, &Affected::ids([Uuid::new_v4()]))
            .await;
        assert!(cache.get::<u64>(&stats_key).await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = CoherentCache::default();
        let key = keys::user_balance(Uuid::new_v4());
        cache.put(&key, 1.0_f64).await;
        cache.clear();
        assert!(cache.get::<f64>(&key).await.is_none());
    }

    #[test]
    fn test_hit_ratio() {
        let metrics = CacheMetrics {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((metrics.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert!(CacheMetrics::default().hit_ratio().abs() < f64::EPSILON);
    }
}
