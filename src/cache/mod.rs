//! Tiered Content Cache
//!
//! Serves molecular-structure payloads (and any other sized payload type)
//! through an ordered list of storage tiers with request deduplication,
//! cache warming, explicit invalidation, and hit/miss/latency metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      Cache Coordinator                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │  Tier 0 (fastest)  │  Tier 1   │  ...  │  Tier N-1 (slowest)  │
//! │  ┌──────────────┐  │           │       │                      │
//! │  │ TierStore    │  │ TierStore │       │ TierStore            │
//! │  └──────────────┘  │           │       │                      │
//! │         │                │                    │               │
//! │         └────────────────┴────────────────────┘               │
//! │                          │                                    │
//! │            Deduplication Registry + Upstream Fetch            │
//! │            (at most one in-flight fetch per key)              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! - Read-through: tiers are consulted fastest to slowest; the first hit
//!   wins and back-fills every faster tier (warming).
//! - Full miss: concurrent callers for the same key share one upstream
//!   fetch; the result is written through every tier, front to back.
//! - Failures are never cached; tier I/O problems degrade to misses or
//!   best-effort writes and never block serving the payload.

mod coordinator;
mod dedup;
mod entry;
mod key;
mod memory;
mod metrics;
mod tier;

pub use coordinator::{
    AggregateStats, CacheCoordinator, CacheCoordinatorBuilder, FetchOptions, PrefetchReport,
};
pub use dedup::{DeduplicationRegistry, SharedFetch};
pub use entry::{CacheEntry, CachePayload};
pub use key::CacheKey;
pub use memory::{MemoryTier, MemoryTierConfig, DEFAULT_MEMORY_CAPACITY};
pub use metrics::{LatencyTracker, MetricsCollector, MetricsSnapshot, TierCounterSnapshot};
pub use tier::{TierStats, TierStore};
