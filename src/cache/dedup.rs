//! In-Flight Fetch Deduplication
//!
//! Tracks pending upstream fetches by key so that concurrent callers for
//! the same resource share one upstream operation. The check-and-register
//! step is atomic: at most one fetch is ever in flight per key.

use std::future::Future;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use super::key::CacheKey;
use crate::error::CacheError;

/// Handle to a pending upstream fetch, shared by every waiter on its key.
///
/// Cloning the handle is cheap; awaiting any clone yields the same settled
/// result.
pub type SharedFetch<T> = Shared<BoxFuture<'static, std::result::Result<T, CacheError>>>;

/// Registry of in-flight upstream fetches.
///
/// At most one [`PendingFetch`](SharedFetch) exists per key at any instant:
/// it is created when a miss triggers an upstream fetch and destroyed when
/// that fetch settles, releasing all waiters with the shared result.
pub struct DeduplicationRegistry<T: Clone> {
    pending: DashMap<CacheKey, SharedFetch<T>>,
}

impl<T> DeduplicationRegistry<T>
where
    T: Clone + Send + 'static,
{
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Return the pending fetch for `key`, creating one from `factory` if
    /// none exists.
    ///
    /// The boolean is `true` only for the caller whose `factory` ran, so
    /// exactly one caller per key owns the created fetch. The dashmap shard
    /// lock is held across check-and-register, which makes the step atomic;
    /// `factory` therefore must only construct the future (e.g. wrap an
    /// already-spawned task handle), never block or await.
    pub fn get_or_create<F, Fut>(&self, key: &CacheKey, factory: F) -> (SharedFetch<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, CacheError>> + Send + 'static,
    {
        match self.pending.entry(key.clone()) {
            Entry::Occupied(slot) => (slot.get().clone(), false),
            Entry::Vacant(slot) => {
                let shared = factory().boxed().shared();
                slot.insert(shared.clone());
                (shared, true)
            }
        }
    }

    /// Drop the pending entry for `key` once its fetch has settled.
    ///
    /// Idempotent: completing an already-removed key is a no-op, so it does
    /// not matter which observer of the settled fetch calls this first.
    pub fn complete(&self, key: &CacheKey) {
        self.pending.remove(key);
    }

    /// Number of fetches currently in flight
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no fetches are in flight
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for DeduplicationRegistry<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
