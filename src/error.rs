//! Error types for the cache layer.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by the tiered cache.
///
/// All variants carry owned strings so the type is `Clone`: a single error
/// instance produced by one upstream fetch is handed to every waiter that
/// deduplicated onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key failed normalization (e.g. empty after trimming)
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// Upstream fetch failed (network, not-found, server error)
    #[error("upstream fetch failed for '{key}': {reason}")]
    Upstream { key: String, reason: String },

    /// A storage tier failed a get/put/delete
    #[error("tier '{tier}' I/O error: {reason}")]
    TierIo { tier: String, reason: String },

    /// The task driving a shared upstream fetch died before settling
    #[error("in-flight fetch for '{key}' aborted: {reason}")]
    FetchAborted { key: String, reason: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Convenience constructor for upstream callback failures.
    pub fn upstream(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for tier I/O failures.
    pub fn tier_io(tier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TierIo {
            tier: tier.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_cloneable() {
        let err = CacheError::upstream("1abc", "connection reset");
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }

    #[test]
    fn test_display_includes_key() {
        let err = CacheError::upstream("1abc", "timeout");
        let msg = format!("{}", err);
        assert!(msg.contains("1abc"));
        assert!(msg.contains("timeout"));
    }
}
