use crate::error::InferenceError;
use crate::prompt::truncate_code;
use crate::provider::{InferenceRequest, ModelProvider};
use crate::retry::RetryPolicy;
use refine_code_chunker::Chunk;
use refine_finding_cache::{CacheEntry, CacheStore};
use refine_protocol::{AnalysisConfig, AnalysisFocus, Finding, Fingerprint};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Oversized chunks get this multiple of the normal byte budget before
/// truncation kicks in.
const RELAXED_PAYLOAD_FACTOR: usize = 4;

/// Counters for one dispatcher's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub model_calls: u64,
    pub retries: u64,
}

/// Issues one inference per chunk: cache check, model call with bounded
/// retries, cache write.
///
/// The dispatcher performs no global synchronization beyond the cache
/// contract and a per-fingerprint single-flight gate; the orchestrator's
/// worker pool bounds how many of these calls run at once.
pub struct Dispatcher {
    provider: Arc<dyn ModelProvider>,
    cache: Arc<dyn CacheStore>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    focus: AnalysisFocus,
    relaxed_payload_bytes: usize,
    in_flight: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    model_calls: AtomicU64,
    retries: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        cache: Arc<dyn CacheStore>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            retry: RetryPolicy::from_config(config),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
            focus: config.focus,
            relaxed_payload_bytes: config.max_chunk_bytes * RELAXED_PAYLOAD_FACTOR,
            in_flight: Mutex::new(HashMap::new()),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            model_calls: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            model_calls: self.model_calls.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    /// Analyze one chunk. Findings come back in chunk-local coordinates.
    pub async fn analyze(
        &self,
        chunk: &Chunk,
        language: &str,
    ) -> Result<Vec<Finding>, InferenceError> {
        if let Some(entry) = self.cache.get(&chunk.fingerprint).await {
            log::debug!(
                "cache hit for chunk {} ({})",
                chunk.index,
                chunk.fingerprint.short()
            );
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.findings);
        }

        // Single-flight per fingerprint: a second worker landing on the
        // same chunk waits here, then finds the first worker's cache write.
        // Losing the race and computing twice is acceptable; the overwrite
        // is idempotent.
        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(chunk.fingerprint.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = gate.lock().await;

        let result = if let Some(entry) = self.cache.get(&chunk.fingerprint).await {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            Ok(entry.findings)
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
            self.compute(chunk, language).await
        };

        drop(guard);
        self.in_flight.lock().await.remove(&chunk.fingerprint);

        result
    }

    async fn compute(
        &self,
        chunk: &Chunk,
        language: &str,
    ) -> Result<Vec<Finding>, InferenceError> {
        let request = self.build_request(chunk, language);
        let findings = self.infer_with_retry(&request, &chunk.fingerprint).await?;

        // Only successes are cached; a failed chunk must be recomputed next
        // run rather than poisoning the store.
        let entry = CacheEntry::new(findings.clone(), self.provider.model_id());
        if let Err(e) = self.cache.put(&chunk.fingerprint, entry).await {
            log::warn!(
                "cache write failed for {} (non-fatal): {e}",
                chunk.fingerprint.short()
            );
        }

        Ok(findings)
    }

    fn build_request(&self, chunk: &Chunk, language: &str) -> InferenceRequest {
        let code = if chunk.oversized && chunk.payload.len() > self.relaxed_payload_bytes {
            log::warn!(
                "oversized chunk {} exceeds even the relaxed limit ({} > {} bytes); truncating",
                chunk.index,
                chunk.payload.len(),
                self.relaxed_payload_bytes
            );
            truncate_code(&chunk.payload, self.relaxed_payload_bytes)
        } else {
            chunk.payload.clone()
        };

        InferenceRequest {
            code,
            language: language.to_string(),
            focus: self.focus,
            oversized: chunk.oversized,
        }
    }

    async fn infer_with_retry(
        &self,
        request: &InferenceRequest,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<Finding>, InferenceError> {
        let mut attempt: u32 = 0;
        loop {
            self.model_calls.fetch_add(1, Ordering::Relaxed);

            let outcome = tokio::time::timeout(self.attempt_timeout, self.provider.infer(request))
                .await
                .unwrap_or_else(|_| {
                    Err(InferenceError::transient(format!(
                        "attempt timed out after {:?}",
                        self.attempt_timeout
                    )))
                });

            let error = match outcome {
                Ok(findings) => return Ok(findings),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            };

            if attempt >= self.retry.max_retries {
                log::warn!(
                    "chunk {} failed after {} attempts: {error}",
                    fingerprint.short(),
                    attempt + 1
                );
                return Err(error);
            }

            let delay = self.retry.delay_for(attempt);
            log::debug!(
                "transient failure for {} (attempt {}/{}), retrying in {delay:?}: {error}",
                fingerprint.short(),
                attempt + 1,
                self.retry.max_retries + 1
            );
            self.retries.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
