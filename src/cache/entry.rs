//! Cache Entry Types
//!
//! An entry wraps one cached payload with the bookkeeping the tiers need:
//! a size fixed at insertion, creation/access timestamps, and optional tags
//! for bulk invalidation.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// Payload types the cache can account for.
///
/// `size_bytes` is read exactly once, when an entry is created, and drives
/// tier capacity accounting from then on. It is never recomputed.
pub trait CachePayload: Clone + Send + Sync + 'static {
    /// Size of this payload in bytes
    fn size_bytes(&self) -> u64;
}

impl CachePayload for Bytes {
    fn size_bytes(&self) -> u64 {
        self.len() as u64
    }
}

impl CachePayload for String {
    fn size_bytes(&self) -> u64 {
        self.len() as u64
    }
}

impl CachePayload for Vec<u8> {
    fn size_bytes(&self) -> u64 {
        self.len() as u64
    }
}

/// Current time as whole seconds since the epoch.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current time as nanoseconds since the epoch.
///
/// Access timestamps keep nanosecond resolution so LRU ordering stays
/// stable under rapid successive writes.
pub(crate) fn epoch_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Cache entry containing a payload and its metadata.
///
/// `access_count` and `last_accessed` are atomics mutated on every read;
/// everything else is fixed at construction.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The cached payload
    payload: T,
    /// Payload size, computed once at insertion
    size_bytes: u64,
    /// Creation timestamp (epoch seconds)
    created_at: u64,
    /// Last access timestamp (epoch nanoseconds)
    last_accessed: AtomicU64,
    /// Access count
    access_count: AtomicU32,
    /// Per-entry TTL override (None = use the owning tier's default)
    ttl: Option<Duration>,
    /// Tags for bulk invalidation
    tags: BTreeSet<String>,
}

impl<T: CachePayload> CacheEntry<T> {
    /// Create a new entry, fixing its size from the payload.
    pub fn new(payload: T) -> Self {
        let size_bytes = payload.size_bytes();
        Self {
            payload,
            size_bytes,
            created_at: epoch_secs(),
            last_accessed: AtomicU64::new(epoch_nanos()),
            access_count: AtomicU32::new(0),
            ttl: None,
            tags: BTreeSet::new(),
        }
    }

    /// Attach tags for bulk invalidation.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set a per-entry TTL overriding the owning tier's default.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Get the payload
    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Get payload size in bytes
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get creation time (epoch seconds)
    #[inline]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Get last access time (epoch nanoseconds)
    #[inline]
    pub fn last_accessed(&self) -> u64 {
        self.last_accessed.load(Ordering::Relaxed)
    }

    /// Get access count
    #[inline]
    pub fn access_count(&self) -> u32 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Get the per-entry TTL override, if any
    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Get the tag set
    #[inline]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Check whether the entry carries a tag
    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Record an access and return the new count
    pub fn record_access(&self) -> u32 {
        self.last_accessed.store(epoch_nanos(), Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Check whether the entry has outlived its TTL.
    ///
    /// The per-entry TTL takes precedence; otherwise the owning tier's
    /// default applies. With neither, entries never expire.
    pub fn is_expired(&self, tier_default: Option<Duration>) -> bool {
        let Some(ttl) = self.ttl.or(tier_default) else {
            return false;
        };
        epoch_secs() > self.created_at + ttl.as_secs()
    }
}

impl<T: Clone> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            size_bytes: self.size_bytes,
            created_at: self.created_at,
            last_accessed: AtomicU64::new(self.last_accessed.load(Ordering::Relaxed)),
            access_count: AtomicU32::new(self.access_count.load(Ordering::Relaxed)),
            ttl: self.ttl,
            tags: self.tags.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_computed_once_at_insertion() {
        let entry = CacheEntry::new(Bytes::from_static(b"HEADER    CRAMBIN"));
        assert_eq!(entry.size_bytes(), 17);
    }

    #[test]
    fn test_payload_types_report_sizes() {
        assert_eq!("abc".to_string().size_bytes(), 3);
        assert_eq!(vec![0u8; 12].size_bytes(), 12);
        assert_eq!(Bytes::from_static(b"xy").size_bytes(), 2);
    }

    #[test]
    fn test_access_tracking() {
        let entry = CacheEntry::new(Bytes::from_static(b"data"));
        assert_eq!(entry.access_count(), 0);

        let before = entry.last_accessed();
        let count = entry.record_access();
        assert_eq!(count, 1);
        assert_eq!(entry.access_count(), 1);
        assert!(entry.last_accessed() >= before);
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let entry = CacheEntry::new(Bytes::from_static(b"data"));
        assert!(!entry.is_expired(None));
    }

    #[test]
    fn test_tier_default_ttl_applies() {
        let entry = CacheEntry::new(Bytes::from_static(b"data"));
        assert!(!entry.is_expired(Some(Duration::from_secs(3600))));
    }

    #[test]
    fn test_entry_ttl_overrides_tier_default() {
        // Zero-second entry TTL expires as soon as the clock ticks past
        // created_at; a generous tier default must not rescue it.
        let entry = CacheEntry::new(Bytes::from_static(b"data")).with_ttl(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(1100));
        assert!(entry.is_expired(Some(Duration::from_secs(3600))));
    }

    #[test]
    fn test_tags() {
        let entry = CacheEntry::new(Bytes::from_static(b"data"))
            .with_tags(["search-results", "organism:human"]);
        assert!(entry.has_tag("search-results"));
        assert!(!entry.has_tag("structures"));
        assert_eq!(entry.tags().len(), 2);
    }

    #[test]
    fn test_clone_preserves_metadata() {
        let entry = CacheEntry::new(Bytes::from_static(b"data")).with_tags(["a"]);
        entry.record_access();
        entry.record_access();

        let cloned = entry.clone();
        assert_eq!(cloned.size_bytes(), 4);
        assert_eq!(cloned.access_count(), 2);
        assert_eq!(cloned.created_at(), entry.created_at());
        assert!(cloned.has_tag("a"));
    }
}
