use crate::entry::CacheEntry;
use crate::error::Result;
use crate::store::CacheStore;
use async_trait::async_trait;
use lru::LruCache;
use refine_protocol::Fingerprint;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LRU_CAPACITY: usize = 512;

/// Persistent cache backend: one JSON file per fingerprint in a sharded
/// directory tree, fronted by a small in-memory LRU.
///
/// Writes go through a temp file and rename, so concurrent workers racing
/// on the same fingerprint leave a whole entry either way. Fingerprints
/// already encode content, configuration, and model identity, so the layout
/// needs no further namespacing.
pub struct DiskCache {
    base_dir: PathBuf,
    /// Entry time-to-live in milliseconds; 0 disables expiry
    ttl_ms: u64,
    hot: Mutex<LruCache<Fingerprint, CacheEntry>>,
}

/// Point-in-time size of the on-disk cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

impl DiskCache {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(base_dir, 0)
    }

    #[must_use]
    pub fn with_ttl(base_dir: impl Into<PathBuf>, ttl_ms: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttl_ms,
            hot: Mutex::new(LruCache::new(
                NonZeroUsize::new(LRU_CAPACITY).expect("capacity is nonzero"),
            )),
        }
    }

    /// Shard by the first two byte pairs of the fingerprint so no single
    /// directory grows unbounded.
    #[must_use]
    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        let hex = fingerprint.as_str();
        let shard_a = hex.get(0..2).unwrap_or("00");
        let shard_b = hex.get(2..4).unwrap_or("00");
        self.base_dir
            .join(shard_a)
            .join(shard_b)
            .join(format!("{hex}.json"))
    }

    /// Delete oldest entries until the cache fits `max_bytes`. A budget of
    /// zero disables pruning.
    pub async fn prune(&self, max_bytes: u64) {
        if max_bytes == 0 {
            return;
        }
        let root = self.base_dir.clone();
        let _ = tokio::task::spawn_blocking(move || prune_dir(&root, max_bytes)).await;
    }

    /// Remove every entry, on disk and in the hot layer.
    pub async fn clear(&self) -> Result<()> {
        if let Ok(mut hot) = self.hot.lock() {
            hot.clear();
        }
        match tokio::fs::remove_dir_all(&self.base_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let root = self.base_dir.clone();
        tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            let mut total = 0u64;
            collect_files(&root, &mut files, &mut total);
            CacheStats {
                entries: files.len(),
                total_bytes: total,
            }
        })
        .await
        .unwrap_or(CacheStats {
            entries: 0,
            total_bytes: 0,
        })
    }

    fn hot_get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let mut hot = self.hot.lock().ok()?;
        let entry = hot.get(fingerprint)?.clone();
        if entry.is_expired(self.ttl_ms) {
            hot.pop(fingerprint);
            return None;
        }
        Some(entry)
    }

    fn hot_put(&self, fingerprint: &Fingerprint, entry: &CacheEntry) {
        if let Ok(mut hot) = self.hot.lock() {
            hot.put(fingerprint.clone(), entry.clone());
        }
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        if let Some(entry) = self.hot_get(fingerprint) {
            return Some(entry);
        }

        let path = self.entry_path(fingerprint);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!(
                    "discarding undecodable cache entry {} ({e}); treating as miss",
                    fingerprint.short()
                );
                let _ = tokio::fs::remove_file(&path).await;
                return None;
            }
        };

        if entry.is_expired(self.ttl_ms) {
            log::debug!("cache entry {} expired", fingerprint.short());
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }

        self.hot_put(fingerprint, &entry);
        Some(entry)
    }

    async fn put(&self, fingerprint: &Fingerprint, entry: CacheEntry) -> Result<()> {
        let path = self.entry_path(fingerprint);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(&entry)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if tokio::fs::rename(&tmp, &path).await.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }

        self.hot_put(fingerprint, &entry);
        Ok(())
    }

    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()> {
        if let Ok(mut hot) = self.hot.lock() {
            hot.pop(fingerprint);
        }
        match tokio::fs::remove_file(self.entry_path(fingerprint)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn prune_dir(root: &Path, max_bytes: u64) {
    let mut files = Vec::new();
    let mut total = 0u64;
    collect_files(root, &mut files, &mut total);
    if total <= max_bytes {
        return;
    }
    files.sort_by(|a, b| a.modified.cmp(&b.modified));
    for file in files {
        if total <= max_bytes {
            break;
        }
        if std::fs::remove_file(&file.path).is_ok() {
            total = total.saturating_sub(file.len);
        }
    }
}

#[derive(Clone)]
struct FileEntry {
    path: PathBuf,
    len: u64,
    modified: std::time::SystemTime,
}

fn collect_files(root: &Path, out: &mut Vec<FileEntry>, total: &mut u64) {
    let Ok(read_dir) = std::fs::read_dir(root) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect_files(&path, out, total);
            continue;
        }
        let len = meta.len();
        let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        *total = total.saturating_add(len);
        out.push(FileEntry {
            path,
            len,
            modified,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use refine_protocol::{fingerprint_unit, AnalysisConfig, Category, Finding, LineRange, Severity};
    use tempfile::tempdir;

    fn fp(content: &[u8]) -> Fingerprint {
        fingerprint_unit(content, &AnalysisConfig::default(), "m")
    }

    fn sample_findings() -> Vec<Finding> {
        vec![Finding::new(
            Category::Bug,
            Severity::High,
            LineRange::line(3),
            "possible null dereference",
        )]
    }

    #[tokio::test]
    async fn round_trips_an_entry() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = fp(b"chunk");

        assert!(cache.get(&key).await.is_none());
        cache
            .put(&key, CacheEntry::new(sample_findings(), "model-v1"))
            .await
            .unwrap();

        let entry = cache.get(&key).await.unwrap();
        assert_eq!(entry.findings, sample_findings());
        assert_eq!(entry.model_id, "model-v1");
    }

    #[tokio::test]
    async fn put_overwrites_and_invalidate_removes() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = fp(b"chunk");

        cache
            .put(&key, CacheEntry::new(Vec::new(), "model-v1"))
            .await
            .unwrap();
        cache
            .put(&key, CacheEntry::new(sample_findings(), "model-v2"))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().model_id, "model-v2");

        cache.invalidate(&key).await.unwrap();
        assert!(cache.get(&key).await.is_none());
        // Invalidating a missing key is not an error.
        cache.invalidate(&key).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_entry_reads_as_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = fp(b"chunk");

        let path = cache.entry_path(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        assert!(cache.get(&key).await.is_none());
        // The broken file is dropped so the next run starts clean.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::with_ttl(dir.path(), 1_000);
        let key = fp(b"chunk");

        let mut stale = CacheEntry::new(sample_findings(), "model-v1");
        stale.created_at_ms = stale.created_at_ms.saturating_sub(10_000);
        cache.put(&key, stale).await.unwrap();

        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn hot_layer_serves_reads_without_disk() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = fp(b"chunk");

        cache
            .put(&key, CacheEntry::new(sample_findings(), "model-v1"))
            .await
            .unwrap();

        std::fs::remove_file(cache.entry_path(&key)).unwrap();
        assert!(cache.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn prune_enforces_byte_budget_oldest_first() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        for i in 0..8u8 {
            let key = fp(&[i]);
            cache
                .put(&key, CacheEntry::new(sample_findings(), "model-v1"))
                .await
                .unwrap();
        }

        let before = cache.stats().await;
        assert_eq!(before.entries, 8);

        cache.prune(before.total_bytes / 2).await;
        let after = cache.stats().await;
        assert!(after.entries < before.entries);
        assert!(after.total_bytes <= before.total_bytes / 2);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = fp(b"chunk");

        cache
            .put(&key, CacheEntry::new(Vec::new(), "model-v1"))
            .await
            .unwrap();
        cache.clear().await.unwrap();

        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().await.entries, 0);
    }
}
