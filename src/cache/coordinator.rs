//! Cache Coordinator - Tiered Read-Through Cache
//!
//! Orchestrates lookups and writes across an ordered list of storage tiers
//! (fastest/smallest to slowest/largest), deduplicating concurrent upstream
//! fetches and warming faster tiers with data found in slower ones.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::dedup::DeduplicationRegistry;
use super::entry::{CacheEntry, CachePayload};
use super::key::CacheKey;
use super::memory::{MemoryTier, MemoryTierConfig};
use super::metrics::{LatencyTracker, MetricsCollector, MetricsSnapshot};
use super::tier::{TierStats, TierStore};
use crate::error::{CacheError, Result};

/// Per-fetch options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Bypass tier reads and go straight to the (still deduplicated) upstream
    pub force_refresh: bool,
    /// Start the read walk at the second tier; warming still fills the fastest
    pub skip_fastest_tier: bool,
    /// Tags attached to entries written by this fetch, for bulk invalidation
    pub tags: Vec<String>,
}

/// Merged statistics across all tiers plus fetch-path metrics
#[derive(Debug, Clone, Serialize)]
pub struct AggregateStats {
    pub tiers: Vec<TierStats>,
    pub total_size_bytes: u64,
    pub total_entries: u64,
    pub metrics: MetricsSnapshot,
}

/// Outcome of a [`CacheCoordinator::prefetch`] batch.
///
/// Individual key failures are collected here rather than raised, so one
/// bad key never aborts the batch.
#[derive(Debug, Default)]
pub struct PrefetchReport {
    /// Keys fetched from upstream and written through
    pub fetched: usize,
    /// Keys already present in the fastest tier
    pub already_cached: usize,
    /// Per-key failures (raw key text, error)
    pub failures: Vec<(String, CacheError)>,
}

impl PrefetchReport {
    /// Whether every key in the batch resolved
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builder injecting the ordered tier list at construction time.
pub struct CacheCoordinatorBuilder<T: CachePayload> {
    tiers: Vec<Arc<dyn TierStore<T>>>,
}

impl<T: CachePayload> CacheCoordinatorBuilder<T> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Append the next-slower tier
    pub fn tier(mut self, tier: Arc<dyn TierStore<T>>) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Build the coordinator. At least one tier is required.
    pub fn build(self) -> Result<CacheCoordinator<T>> {
        if self.tiers.is_empty() {
            return Err(CacheError::Config(
                "at least one tier is required".to_string(),
            ));
        }
        let names: Vec<String> = self.tiers.iter().map(|t| t.name().to_string()).collect();
        Ok(CacheCoordinator {
            tiers: self.tiers,
            dedup: Arc::new(DeduplicationRegistry::new()),
            metrics: Arc::new(MetricsCollector::new(names)),
        })
    }
}

impl<T: CachePayload> Default for CacheCoordinatorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tiered cache coordinator.
///
/// Read path: tiers are consulted fastest to slowest; a hit at tier `i`
/// back-fills every tier `< i` before the payload is returned. A full miss
/// funnels through the [`DeduplicationRegistry`] so at most one upstream
/// fetch per key is in flight; its result is written through every tier and
/// shared with all waiters.
pub struct CacheCoordinator<T: CachePayload> {
    tiers: Vec<Arc<dyn TierStore<T>>>,
    dedup: Arc<DeduplicationRegistry<T>>,
    metrics: Arc<MetricsCollector>,
}

impl<T: CachePayload> CacheCoordinator<T> {
    /// Start building a coordinator
    pub fn builder() -> CacheCoordinatorBuilder<T> {
        CacheCoordinatorBuilder::new()
    }

    /// Build a coordinator whose tiers are all in-memory (fastest first)
    pub fn with_memory_tiers(
        configs: impl IntoIterator<Item = MemoryTierConfig>,
    ) -> Result<Self> {
        let mut builder = Self::builder();
        for config in configs {
            builder = builder.tier(Arc::new(MemoryTier::with_config(config)));
        }
        builder.build()
    }

    /// Fetch the payload for `key`, consulting tiers before `upstream`.
    ///
    /// The key is normalized first; invalid keys fail before any tier is
    /// touched. Upstream errors propagate verbatim to every waiter on the
    /// deduplicated fetch and are never cached. Tier write failures are
    /// logged and swallowed: the payload is still returned even if no tier
    /// managed to persist it.
    pub async fn fetch<F, Fut>(&self, key: &str, upstream: F, options: FetchOptions) -> Result<T>
    where
        F: FnOnce(CacheKey) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = CacheKey::new(key)?;
        let tracker = LatencyTracker::start();

        if !options.force_refresh {
            if let Some(payload) = self.lookup_tiers(&key, options.skip_fastest_tier).await {
                self.metrics.record_fetch_latency(tracker.elapsed());
                return Ok(payload);
            }
        }

        let result = self
            .fetch_upstream_shared(&key, || upstream(key.clone()), options.tags)
            .await;
        self.metrics.record_fetch_latency(tracker.elapsed());
        result
    }

    /// Delete `key` from every tier. Idempotent: absent keys are not an
    /// error. A tier I/O failure is reported after all tiers were tried.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        let key = CacheKey::new(key)?;
        let mut first_err = None;

        for tier in &self.tiers {
            if let Err(err) = tier.delete(&key).await {
                warn!(tier = tier.name(), key = %key, error = %err, "invalidation delete failed");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Delete every entry tagged with `tag` from every tier, returning the
    /// total number of entries removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        let mut removed = 0;
        let mut first_err = None;

        for tier in &self.tiers {
            match tier.delete_tagged(tag).await {
                Ok(count) => removed += count,
                Err(err) => {
                    warn!(tier = tier.name(), tag, error = %err, "tag invalidation failed");
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            None => Ok(removed),
            Some(err) => Err(err),
        }
    }

    /// Warm the cache for a batch of keys.
    ///
    /// Keys already present in the fastest tier are skipped; the rest take
    /// the same deduplicated miss path as [`fetch`](Self::fetch). Per-key
    /// failures land in the report instead of aborting the batch.
    pub async fn prefetch<F, Fut>(
        &self,
        keys: impl IntoIterator<Item = impl AsRef<str>>,
        upstream: F,
    ) -> PrefetchReport
    where
        F: Fn(CacheKey) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut report = PrefetchReport::default();

        for raw in keys {
            let raw = raw.as_ref();
            let key = match CacheKey::new(raw) {
                Ok(key) => key,
                Err(err) => {
                    report.failures.push((raw.to_string(), err));
                    continue;
                }
            };

            match self.tiers[0].get(&key).await {
                Ok(Some(_)) => {
                    self.metrics.record_hit(0);
                    report.already_cached += 1;
                    continue;
                }
                Ok(None) => self.metrics.record_miss(0),
                Err(err) => {
                    warn!(tier = self.tiers[0].name(), key = %key, error = %err, "prefetch probe failed");
                    self.metrics.record_miss(0);
                }
            }

            match self
                .fetch_upstream_shared(&key, || upstream(key.clone()), Vec::new())
                .await
            {
                Ok(_) => report.fetched += 1,
                Err(err) => report.failures.push((raw.to_string(), err)),
            }
        }

        report
    }

    /// Merge per-tier statistics with fetch-path metrics
    pub fn stats(&self) -> AggregateStats {
        let tiers: Vec<TierStats> = self.tiers.iter().map(|tier| tier.stats()).collect();
        let total_size_bytes = tiers.iter().map(|t| t.total_size_bytes).sum();
        let total_entries = tiers.iter().map(|t| t.entry_count).sum();

        AggregateStats {
            tiers,
            total_size_bytes,
            total_entries,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Snapshot of the fetch-path metrics alone
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of configured tiers
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Number of upstream fetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.dedup.len()
    }

    /// Clear every tier
    pub async fn clear(&self) -> Result<()> {
        for tier in &self.tiers {
            tier.clear().await?;
        }
        Ok(())
    }

    /// Walk tiers fastest to slowest; on a hit, warm the faster tiers.
    async fn lookup_tiers(&self, key: &CacheKey, skip_fastest: bool) -> Option<T> {
        let start = if skip_fastest && self.tiers.len() > 1 {
            1
        } else {
            0
        };

        for (idx, tier) in self.tiers.iter().enumerate().skip(start) {
            match tier.get(key).await {
                Ok(Some(entry)) => {
                    debug!(tier = tier.name(), key = %key, "cache hit");
                    self.metrics.record_hit(idx);
                    self.warm_faster_tiers(idx, key, &entry).await;
                    return Some(entry.payload().clone());
                }
                Ok(None) => self.metrics.record_miss(idx),
                Err(err) => {
                    // A failing tier degrades to a miss; the next tier or
                    // the upstream still gets a chance to answer.
                    warn!(tier = tier.name(), key = %key, error = %err, "tier read failed, treating as miss");
                    self.metrics.record_miss(idx);
                }
            }
        }

        None
    }

    /// Back-fill every tier faster than the one that hit. Best-effort:
    /// warming failures never fail the fetch.
    async fn warm_faster_tiers(&self, hit_idx: usize, key: &CacheKey, entry: &CacheEntry<T>) {
        for idx in 0..hit_idx {
            let tier = &self.tiers[idx];
            let mut warmed =
                CacheEntry::new(entry.payload().clone()).with_tags(entry.tags().iter().cloned());
            if let Some(ttl) = entry.ttl() {
                warmed = warmed.with_ttl(ttl);
            }

            match tier.put(key.clone(), warmed).await {
                Ok(()) => self.metrics.record_warming_write(idx),
                Err(err) => {
                    warn!(tier = tier.name(), key = %key, error = %err, "warming write failed");
                    self.metrics.record_write_error(idx);
                }
            }
        }
    }

    /// Miss path: join or register the per-key pending fetch.
    ///
    /// The upstream future runs on a spawned task, so a waiter abandoning
    /// its `fetch` call never cancels the shared operation — it completes
    /// and populates the tiers for everyone else.
    async fn fetch_upstream_shared<F, Fut>(
        &self,
        key: &CacheKey,
        make_upstream: F,
        tags: Vec<String>,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (shared, registered) = self.dedup.get_or_create(key, || {
            let tiers = self.tiers.clone();
            let dedup = Arc::clone(&self.dedup);
            let metrics = Arc::clone(&self.metrics);
            let upstream = make_upstream();
            let task_key = key.clone();
            let join_key = key.as_str().to_string();

            let handle = tokio::spawn(async move {
                // Released when the task finishes, even if the upstream
                // future panics, so the key can be fetched again. The guard
                // drops after the write-through below, so callers arriving
                // after release hit the cache instead of refetching.
                let _release = CompleteGuard {
                    dedup,
                    key: task_key.clone(),
                };

                metrics.record_upstream_fetch();
                let result = upstream.await;

                match &result {
                    Ok(payload) => {
                        write_through(&tiers, &metrics, &task_key, payload, &tags).await;
                    }
                    Err(err) => {
                        metrics.record_upstream_failure();
                        debug!(key = %task_key, error = %err, "upstream fetch failed");
                    }
                }

                result
            });

            async move {
                match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(CacheError::FetchAborted {
                        key: join_key,
                        reason: join_err.to_string(),
                    }),
                }
            }
        });

        if !registered {
            self.metrics.record_deduplicated_wait();
        }

        shared.await
    }
}

/// Removes a pending-fetch registration when dropped, so the registry never
/// leaks an entry no matter how the driving task ends.
struct CompleteGuard<T: CachePayload> {
    dedup: Arc<DeduplicationRegistry<T>>,
    key: CacheKey,
}

impl<T: CachePayload> Drop for CompleteGuard<T> {
    fn drop(&mut self) {
        self.dedup.complete(&self.key);
    }
}

/// Write a fetched payload into every tier, front to back. Failures are
/// logged and swallowed: serving the payload matters more than durability
/// of the cache itself.
async fn write_through<T: CachePayload>(
    tiers: &[Arc<dyn TierStore<T>>],
    metrics: &MetricsCollector,
    key: &CacheKey,
    payload: &T,
    tags: &[String],
) {
    for (idx, tier) in tiers.iter().enumerate() {
        let entry = CacheEntry::new(payload.clone()).with_tags(tags.iter().cloned());
        match tier.put(key.clone(), entry).await {
            Ok(()) => metrics.record_warming_write(idx),
            Err(err) => {
                warn!(tier = tier.name(), key = %key, error = %err, "write-through failed");
                metrics.record_write_error(idx);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
