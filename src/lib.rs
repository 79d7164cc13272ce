//! molcore - Core Library for Molecular-Structure Services
//!
//! Two independent subsystems, each usable standalone:
//!
//! - [`cache`] - a tiered content cache coordinator serving structure
//!   payloads through an ordered list of storage tiers, with request
//!   deduplication, cache warming, explicit invalidation, and
//!   hit/miss/latency metrics.
//! - [`energy`] - a spatially-accelerated pairwise interaction-energy
//!   evaluator replacing O(n²) non-bonded force calculations with a
//!   uniform-grid neighbor search.
//!
//! This crate is a programmatic library boundary only: no wire format,
//! file format, or CLI surface. HTTP adapters, storage backends beyond the
//! in-memory reference tier, and the simulation driver that integrates
//! forces are external collaborators.
//!
//! # Cache example
//!
//! ```no_run
//! use bytes::Bytes;
//! use molcore::cache::{CacheCoordinator, FetchOptions, MemoryTierConfig};
//!
//! # async fn example() -> molcore::Result<()> {
//! let cache = CacheCoordinator::with_memory_tiers([
//!     MemoryTierConfig { name: "ram".into(), capacity_bytes: 64 << 20, default_ttl: None },
//!     MemoryTierConfig { name: "disk".into(), capacity_bytes: 1 << 30, default_ttl: None },
//! ])?;
//!
//! let payload = cache
//!     .fetch(
//!         "pdb:1CRN",
//!         |key| async move { Ok(Bytes::from(format!("structure for {key}"))) },
//!         FetchOptions::default(),
//!     )
//!     .await?;
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```
//!
//! # Energy example
//!
//! ```
//! use nalgebra::Point3;
//! use molcore::energy::{LennardJones, PairPotentialEvaluator};
//!
//! let evaluator = PairPotentialEvaluator::new(12.0).unwrap();
//! let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(3.8, 0.0, 0.0)];
//! let result = evaluator
//!     .evaluate(&positions, &LennardJones::new(3.4, 0.238))
//!     .unwrap();
//! assert_eq!(result.pair_count, 1);
//! ```

pub mod cache;
pub mod energy;
pub mod error;

// Re-export commonly used types
pub use cache::{CacheCoordinator, CacheKey, FetchOptions, MemoryTier, MemoryTierConfig, TierStore};
pub use energy::{LennardJones, PairPotential, PairPotentialEvaluator, PairResult, UniformGrid};
pub use error::{CacheError, Result};
