//! In-Memory Tier
//!
//! Reference [`TierStore`] backend: a mutex-held map bounded by total
//! payload bytes, with LRU eviction and an optional tier-wide TTL. Used as
//! the fastest tier in production and as the test backend for every tier
//! position.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::entry::{epoch_secs, CacheEntry, CachePayload};
use super::key::CacheKey;
use super::tier::{TierStats, TierStore};
use crate::error::{CacheError, Result};

/// Default capacity (256MB)
pub const DEFAULT_MEMORY_CAPACITY: u64 = 256 * 1024 * 1024;

/// Memory tier configuration
#[derive(Debug, Clone)]
pub struct MemoryTierConfig {
    /// Tier name used in logs and stats
    pub name: String,
    /// Maximum total payload bytes
    pub capacity_bytes: u64,
    /// Default TTL applied to entries without their own (None = no expiry)
    pub default_ttl: Option<Duration>,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            capacity_bytes: DEFAULT_MEMORY_CAPACITY,
            default_ttl: None,
        }
    }
}

/// Map plus its byte total, guarded together so puts observe a consistent
/// size while deciding what to evict.
struct Inner<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    total_size: u64,
}

/// In-memory storage tier with synchronous LRU eviction.
pub struct MemoryTier<T> {
    config: MemoryTierConfig,
    inner: Mutex<Inner<T>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    last_cleanup: AtomicU64,
}

impl<T: CachePayload> MemoryTier<T> {
    /// Create a tier with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryTierConfig::default())
    }

    /// Create a tier with custom configuration
    pub fn with_config(config: MemoryTierConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                total_size: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            last_cleanup: AtomicU64::new(0),
        }
    }

    /// Shorthand for a bounded, unnamed-TTL tier
    pub fn bounded(name: impl Into<String>, capacity_bytes: u64) -> Self {
        Self::with_config(MemoryTierConfig {
            name: name.into(),
            capacity_bytes,
            default_ttl: None,
        })
    }

    /// Current total payload bytes
    pub fn size(&self) -> u64 {
        self.inner.lock().total_size
    }

    /// Current entry count
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the tier holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the tier currently holds a live (non-expired) entry
    pub fn contains(&self, key: &CacheKey) -> bool {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .is_some_and(|e| !e.is_expired(self.config.default_ttl))
    }

    /// Evict LRU entries until `total_size <= capacity`. Caller holds the lock.
    fn evict_locked(&self, inner: &mut Inner<T>) {
        while inner.total_size > self.config.capacity_bytes {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed())
                .map(|(key, _)| key.clone());

            let Some(key) = victim else {
                break;
            };
            if let Some(evicted) = inner.entries.remove(&key) {
                inner.total_size -= evicted.size_bytes();
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(
                    tier = %self.config.name,
                    key = %key,
                    size = evicted.size_bytes(),
                    "evicted LRU entry"
                );
            }
        }
    }
}

impl<T: CachePayload> Default for MemoryTier<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: CachePayload> TierStore<T> for MemoryTier<T> {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<T>>> {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get(key) {
            if entry.is_expired(self.config.default_ttl) {
                // Expired entries behave as absent and are dropped on the
                // read that discovers them.
                let size = entry.size_bytes();
                inner.entries.remove(key);
                inner.total_size -= size;
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            entry.record_access();
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(entry.clone()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn put(&self, key: CacheKey, entry: CacheEntry<T>) -> Result<()> {
        let size = entry.size_bytes();
        if size > self.config.capacity_bytes {
            return Err(CacheError::tier_io(
                &self.config.name,
                format!(
                    "entry of {} bytes exceeds tier capacity of {} bytes",
                    size, self.config.capacity_bytes
                ),
            ));
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.entries.insert(key, entry) {
            inner.total_size -= old.size_bytes();
        }
        inner.total_size += size;

        // Capacity invariant holds the moment put returns.
        self.evict_locked(&mut inner);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut inner = self.inner.lock();
        match inner.entries.remove(key) {
            Some(removed) => {
                inner.total_size -= removed.size_bytes();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tagged(&self, tag: &str) -> Result<usize> {
        let mut inner = self.inner.lock();
        let victims: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &victims {
            if let Some(removed) = inner.entries.remove(key) {
                inner.total_size -= removed.size_bytes();
            }
        }
        Ok(victims.len())
    }

    async fn evict_if_over_capacity(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.evict_locked(&mut inner);
        self.last_cleanup.store(epoch_secs(), Ordering::Relaxed);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_size = 0;
        Ok(())
    }

    fn stats(&self) -> TierStats {
        let (total_size_bytes, entry_count) = {
            let inner = self.inner.lock();
            (inner.total_size, inner.entries.len() as u64)
        };
        let last_cleanup = self.last_cleanup.load(Ordering::Relaxed);

        TierStats {
            name: self.config.name.clone(),
            total_size_bytes,
            entry_count,
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            last_cleanup_at: (last_cleanup > 0).then_some(last_cleanup),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bytes::Bytes;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s).unwrap()
    }

    fn entry(data: &[u8]) -> CacheEntry<Bytes> {
        CacheEntry::new(Bytes::copy_from_slice(data))
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();

        tier.put(key("1crn"), entry(b"ATOM")).await.unwrap();

        let found = tier.get(&key("1crn")).await.unwrap().unwrap();
        assert_eq!(found.payload().as_ref(), b"ATOM");
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.size(), 4);
    }

    #[tokio::test]
    async fn test_miss_is_counted() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();

        assert!(tier.get(&key("absent")).await.unwrap().is_none());

        let stats = tier.stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 0);
    }

    #[tokio::test]
    async fn test_hit_plus_miss_equals_lookups() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();
        tier.put(key("a"), entry(b"x")).await.unwrap();

        tier.get(&key("a")).await.unwrap();
        tier.get(&key("a")).await.unwrap();
        tier.get(&key("b")).await.unwrap();

        let stats = tier.stats();
        assert_eq!(stats.hit_count + stats.miss_count, 3);
    }

    #[tokio::test]
    async fn test_replace_adjusts_size() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();

        tier.put(key("a"), entry(b"12345678")).await.unwrap();
        assert_eq!(tier.size(), 8);

        tier.put(key("a"), entry(b"123")).await.unwrap();
        assert_eq!(tier.size(), 3);
        assert_eq!(tier.len(), 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_within_put() {
        let tier: MemoryTier<Bytes> = MemoryTier::bounded("l1", 20);

        tier.put(key("a"), entry(&[1u8; 10])).await.unwrap();
        tier.put(key("b"), entry(&[2u8; 10])).await.unwrap();
        // Third put overflows: the least recently touched entry (a) goes.
        tier.put(key("c"), entry(&[3u8; 10])).await.unwrap();

        assert!(tier.size() <= 20);
        assert!(!tier.contains(&key("a")));
        assert!(tier.contains(&key("b")));
        assert!(tier.contains(&key("c")));
        assert_eq!(tier.stats().eviction_count, 1);
    }

    #[tokio::test]
    async fn test_access_refreshes_lru_position() {
        let tier: MemoryTier<Bytes> = MemoryTier::bounded("l1", 20);

        tier.put(key("a"), entry(&[1u8; 10])).await.unwrap();
        tier.put(key("b"), entry(&[2u8; 10])).await.unwrap();

        // Touch "a" so "b" becomes the LRU victim.
        tier.get(&key("a")).await.unwrap();
        tier.put(key("c"), entry(&[3u8; 10])).await.unwrap();

        assert!(tier.contains(&key("a")));
        assert!(!tier.contains(&key("b")));
        assert!(tier.contains(&key("c")));
    }

    #[tokio::test]
    async fn test_oversized_entry_is_rejected() {
        let tier: MemoryTier<Bytes> = MemoryTier::bounded("l1", 8);

        let result = tier.put(key("huge"), entry(&[0u8; 64])).await;
        assert_matches!(result, Err(CacheError::TierIo { .. }));
        assert!(tier.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();
        tier.put(key("a"), entry(b"x")).await.unwrap();

        assert!(tier.delete(&key("a")).await.unwrap());
        assert!(!tier.delete(&key("a")).await.unwrap());
        assert_eq!(tier.size(), 0);
    }

    #[tokio::test]
    async fn test_delete_tagged() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();

        tier.put(
            key("q1"),
            entry(b"r1").with_tags(["search-results"]),
        )
        .await
        .unwrap();
        tier.put(
            key("q2"),
            entry(b"r2").with_tags(["search-results"]),
        )
        .await
        .unwrap();
        tier.put(key("1crn"), entry(b"ATOM")).await.unwrap();

        let removed = tier.delete_tagged("search-results").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(tier.len(), 1);
        assert!(tier.contains(&key("1crn")));
    }

    #[tokio::test]
    async fn test_expired_entry_behaves_as_absent() {
        let tier: MemoryTier<Bytes> = MemoryTier::with_config(MemoryTierConfig {
            name: "ttl".to_string(),
            capacity_bytes: 1024,
            default_ttl: Some(Duration::ZERO),
        });

        tier.put(key("a"), entry(b"stale")).await.unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        assert!(tier.get(&key("a")).await.unwrap().is_none());
        // The discovering read dropped it.
        assert_eq!(tier.len(), 0);
        assert_eq!(tier.size(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let tier: MemoryTier<Bytes> = MemoryTier::new();
        for i in 0..10 {
            tier.put(key(&format!("k{}", i)), entry(&[i as u8; 16]))
                .await
                .unwrap();
        }

        tier.clear().await.unwrap();
        assert!(tier.is_empty());
        assert_eq!(tier.size(), 0);
    }

    #[tokio::test]
    async fn test_evict_if_over_capacity_records_cleanup_time() {
        let tier: MemoryTier<Bytes> = MemoryTier::bounded("l1", 1024);
        tier.put(key("a"), entry(b"x")).await.unwrap();

        assert!(tier.stats().last_cleanup_at.is_none());
        tier.evict_if_over_capacity().await.unwrap();
        assert!(tier.stats().last_cleanup_at.is_some());
    }
}
