use crate::entry::CacheEntry;
use crate::error::Result;
use async_trait::async_trait;
use refine_protocol::Fingerprint;
use std::collections::HashMap;
use std::sync::Mutex;

/// Pluggable fingerprint → findings store.
///
/// At most one authoritative entry exists per fingerprint; `put` overwrites.
/// `get` returns `None` for misses *and* backend outages; degradation is
/// the backend's job to log, never the caller's to handle. `put` and
/// `invalidate` surface errors so callers can log them, but callers must
/// continue regardless.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry>;

    async fn put(&self, fingerprint: &Fingerprint, entry: CacheEntry) -> Result<()>;

    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()>;
}

/// In-memory store for tests and cacheless runs. Safe under concurrent
/// access from the worker pool.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|map| map.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        match self.entries.lock() {
            Ok(map) => map.get(fingerprint).cloned(),
            Err(poisoned) => {
                log::warn!("memory cache lock poisoned; treating as miss");
                poisoned.into_inner().get(fingerprint).cloned()
            }
        }
    }

    async fn put(&self, fingerprint: &Fingerprint, entry: CacheEntry) -> Result<()> {
        let mut map = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        map.insert(fingerprint.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()> {
        let mut map = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        map.remove(fingerprint);
        Ok(())
    }
}
