//! Namespaced key/value cache for resolved digests
//!
//! [`PackageCache`] is the seam; [`MemoryCache`] is an in-process implementation
//! backed by moka with a time-to-live per entry.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Shared cache consulted before downloading an artifact
///
/// Implementations must make `get` and `set` atomic per key.
#[async_trait]
pub trait PackageCache: Send + Sync {
    /// Look up `key` in `namespace`
    async fn get(&self, namespace: &str, key: &str) -> Option<String>;

    /// Store `value` under `key` in `namespace` for `ttl_minutes`
    async fn set(&self, namespace: &str, key: &str, value: String, ttl_minutes: u64);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    namespace: String,
    key: String,
}

impl CacheKey {
    fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after its own TTL
struct EntryExpiry;

impl Expiry<CacheKey, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`PackageCache`]
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<CacheKey, CacheEntry>,
}

impl MemoryCache {
    /// Create new cache with max capacity
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryExpiry)
                .build(),
        }
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Flush pending maintenance so counts and expirations are current
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MemoryCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait]
impl PackageCache for MemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.inner
            .get(&CacheKey::new(namespace, key))
            .await
            .map(|entry| entry.value)
    }

    async fn set(&self, namespace: &str, key: &str, value: String, ttl_minutes: u64) {
        let entry = CacheEntry {
            value,
            ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
        };
        self.inner.insert(CacheKey::new(namespace, key), entry).await;
    }
}
