use refine_protocol::Finding;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The cached outcome of one chunk inference: ordered findings plus the
/// metadata needed to reason about staleness.
///
/// Owned by the cache store; entries for the same fingerprint are
/// semantically identical, so last-writer-wins overwrites are safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub findings: Vec<Finding>,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at_ms: u64,
    /// Identity of the model that produced the findings
    pub model_id: String,
}

impl CacheEntry {
    #[must_use]
    pub fn new(findings: Vec<Finding>, model_id: impl Into<String>) -> Self {
        Self {
            findings,
            created_at_ms: now_ms(),
            model_id: model_id.into(),
        }
    }

    /// True when the entry has outlived `ttl_ms`. A TTL of zero disables
    /// expiry.
    #[must_use]
    pub fn is_expired(&self, ttl_ms: u64) -> bool {
        ttl_ms > 0 && now_ms().saturating_sub(self.created_at_ms) > ttl_ms
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
