//! Cache Metrics Collection
//!
//! Rolling counters and latency tracking for the fetch path, sized to the
//! coordinator's injected tier list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters for one tier position in the hierarchy.
#[derive(Debug, Default)]
struct TierCounters {
    name: String,
    hits: AtomicU64,
    misses: AtomicU64,
    warming_writes: AtomicU64,
    write_errors: AtomicU64,
}

/// Metrics collector for the fetch path.
///
/// All counters use atomic increments and are safe under concurrent access.
#[derive(Debug)]
pub struct MetricsCollector {
    tiers: Vec<TierCounters>,
    upstream_fetches: AtomicU64,
    upstream_failures: AtomicU64,
    deduplicated_waits: AtomicU64,
    // Rolling fetch latency (microseconds, exponential moving average)
    fetch_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a collector for the given ordered tier names
    pub fn new(tier_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let tiers = tier_names
            .into_iter()
            .map(|name| TierCounters {
                name: name.into(),
                ..Default::default()
            })
            .collect();

        Self {
            tiers,
            upstream_fetches: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            deduplicated_waits: AtomicU64::new(0),
            fetch_latency_us: AtomicU64::new(0),
        }
    }

    /// Record a hit at tier position `tier`
    pub fn record_hit(&self, tier: usize) {
        if let Some(t) = self.tiers.get(tier) {
            t.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a miss at tier position `tier`
    pub fn record_miss(&self, tier: usize) {
        if let Some(t) = self.tiers.get(tier) {
            t.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful warming or write-through write into tier `tier`
    pub fn record_warming_write(&self, tier: usize) {
        if let Some(t) = self.tiers.get(tier) {
            t.warming_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a swallowed write failure at tier `tier`
    pub fn record_write_error(&self, tier: usize) {
        if let Some(t) = self.tiers.get(tier) {
            t.write_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an upstream fetch being issued
    pub fn record_upstream_fetch(&self) {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upstream fetch failing
    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a caller joining an already-pending fetch
    pub fn record_deduplicated_wait(&self) {
        self.deduplicated_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one fetch duration into the rolling latency average
    pub fn record_fetch_latency(&self, duration: Duration) {
        let new_us = duration.as_micros() as u64;
        let alpha = 0.1; // EMA smoothing factor

        loop {
            let current = self.fetch_latency_us.load(Ordering::Relaxed);
            let updated = if current == 0 {
                new_us
            } else {
                ((1.0 - alpha) * current as f64 + alpha * new_us as f64) as u64
            };

            if self
                .fetch_latency_us
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Rolling average fetch latency
    pub fn avg_fetch_latency(&self) -> Duration {
        Duration::from_micros(self.fetch_latency_us.load(Ordering::Relaxed))
    }

    fn tier_hits(&self) -> u64 {
        self.tiers
            .iter()
            .map(|t| t.hits.load(Ordering::Relaxed))
            .sum()
    }

    /// Fraction of fetches answered by some tier (vs. going upstream)
    pub fn overall_hit_ratio(&self) -> f64 {
        let hits = self.tier_hits() as f64;
        let total = hits + self.upstream_fetches.load(Ordering::Relaxed) as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tiers: self
                .tiers
                .iter()
                .map(|t| {
                    let hits = t.hits.load(Ordering::Relaxed);
                    let misses = t.misses.load(Ordering::Relaxed);
                    let total = hits + misses;
                    TierCounterSnapshot {
                        name: t.name.clone(),
                        hits,
                        misses,
                        warming_writes: t.warming_writes.load(Ordering::Relaxed),
                        write_errors: t.write_errors.load(Ordering::Relaxed),
                        hit_ratio: if total == 0 {
                            0.0
                        } else {
                            hits as f64 / total as f64
                        },
                    }
                })
                .collect(),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            deduplicated_waits: self.deduplicated_waits.load(Ordering::Relaxed),
            avg_fetch_latency_us: self.fetch_latency_us.load(Ordering::Relaxed),
            overall_hit_ratio: self.overall_hit_ratio(),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for t in &self.tiers {
            t.hits.store(0, Ordering::Relaxed);
            t.misses.store(0, Ordering::Relaxed);
            t.warming_writes.store(0, Ordering::Relaxed);
            t.write_errors.store(0, Ordering::Relaxed);
        }
        self.upstream_fetches.store(0, Ordering::Relaxed);
        self.upstream_failures.store(0, Ordering::Relaxed);
        self.deduplicated_waits.store(0, Ordering::Relaxed);
        self.fetch_latency_us.store(0, Ordering::Relaxed);
    }
}

/// Counter snapshot for one tier position
#[derive(Debug, Clone, Serialize)]
pub struct TierCounterSnapshot {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub warming_writes: u64,
    pub write_errors: u64,
    pub hit_ratio: f64,
}

/// Snapshot of all fetch-path metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tiers: Vec<TierCounterSnapshot>,
    pub upstream_fetches: u64,
    pub upstream_failures: u64,
    pub deduplicated_waits: u64,
    pub avg_fetch_latency_us: u64,
    pub overall_hit_ratio: f64,
}

/// Latency tracker helper
pub struct LatencyTracker {
    start: Instant,
}

impl LatencyTracker {
    /// Start tracking latency
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

// =============================================================================
// Tests
// =============================================================================
