//! Storage Tier Abstraction
//!
//! One tier is one key-value-capable storage layer in the ordered cache
//! hierarchy. Concrete backends (in-process map, embedded database, remote
//! object store) plug in behind this trait; the coordinator only sees the
//! capability surface.

use async_trait::async_trait;
use serde::Serialize;

use super::entry::{CacheEntry, CachePayload};
use super::key::CacheKey;
use crate::error::Result;

/// Per-tier aggregate statistics.
///
/// `hit_count + miss_count` equals the total lookups issued to the tier
/// since its last reset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TierStats {
    /// Tier name
    pub name: String,
    /// Total bytes currently stored
    pub total_size_bytes: u64,
    /// Number of entries currently stored
    pub entry_count: u64,
    /// Lookups that found a live entry
    pub hit_count: u64,
    /// Lookups that found nothing (or only an expired entry)
    pub miss_count: u64,
    /// Entries evicted to satisfy the capacity bound
    pub eviction_count: u64,
    /// Last explicit cleanup pass (epoch seconds), if any
    pub last_cleanup_at: Option<u64>,
}

/// One storage tier, ordered fastest/smallest to slowest/largest.
///
/// Individual operations must be atomic at entry granularity (no torn
/// reads/writes of a single entry); cross-call transactional isolation is
/// not required.
#[async_trait]
pub trait TierStore<T: CachePayload>: Send + Sync {
    /// Tier name used in logs and stats
    fn name(&self) -> &str;

    /// Look up an entry, updating its access metadata on a hit.
    ///
    /// Expired entries behave as absent. I/O failures surface as
    /// [`crate::error::CacheError::TierIo`]; the coordinator treats them
    /// as a miss for this tier.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<T>>>;

    /// Insert or replace an entry.
    ///
    /// Bounded implementations must evict synchronously before returning,
    /// so the capacity invariant holds the moment a put succeeds.
    async fn put(&self, key: CacheKey, entry: CacheEntry<T>) -> Result<()>;

    /// Remove an entry, reporting whether it was present.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// Remove every entry carrying `tag`, returning how many were removed.
    async fn delete_tagged(&self, tag: &str) -> Result<usize>;

    /// Evict least-recently-used entries until within capacity.
    async fn evict_if_over_capacity(&self) -> Result<()>;

    /// Remove all entries.
    async fn clear(&self) -> Result<()>;

    /// Current tier statistics
    fn stats(&self) -> TierStats;
}

// =============================================================================
// Tests
// =============================================================================
