//! Cache Key Normalization
//!
//! Keys are opaque strings identifying a cacheable resource (e.g. a
//! structure accession like `pdb:1crn` or a hash of a search query).

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{CacheError, Result};

/// Normalized cache key.
///
/// Construction trims and lowercases the raw text so that identical logical
/// resources always produce identical keys. The hash of the normalized text
/// is precomputed once for fast comparison and map placement.
#[derive(Clone, Debug, Eq)]
pub struct CacheKey {
    /// Precomputed hash of the normalized text
    hash: u64,
    /// Normalized key text
    text: String,
}

impl CacheKey {
    /// Create a key from raw caller input.
    ///
    /// Returns [`CacheError::InvalidKey`] if the input is empty or
    /// whitespace-only after normalization.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(CacheError::InvalidKey(
                "key is empty after normalization".to_string(),
            ));
        }
        let hash = Self::fx_hash(normalized.as_bytes());
        Ok(Self {
            hash,
            text: normalized,
        })
    }

    /// Fast non-cryptographic hash (FxHash algorithm)
    #[inline]
    fn fx_hash(bytes: &[u8]) -> u64 {
        const SEED: u64 = 0x517cc1b727220a95;
        let mut hash = SEED;
        for &byte in bytes {
            hash = hash.rotate_left(5) ^ (byte as u64);
            hash = hash.wrapping_mul(SEED);
        }
        hash
    }

    /// Get the normalized key text
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Get the precomputed hash
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: compare hashes first
        if self.hash != other.hash {
            return false;
        }
        // Slow path: full string comparison for collision resolution
        self.text == other.text
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Use the pre-computed hash
        self.hash.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================================
// Tests
// =============================================================================
