use crate::aggregate::{self, ChunkOutcome};
use crate::cancel::CancelToken;
use crate::error::{AnalyzerError, Result};
use crate::scanner::UnitScanner;
use refine_code_chunker::{Chunker, SourceUnit};
use refine_finding_cache::CacheStore;
use refine_inference::{DispatchStats, Dispatcher, InferenceError, ModelProvider};
use refine_protocol::{fingerprint_unit, AnalysisConfig, AnalysisResult};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Per-unit progression: `PENDING -> CHUNKING -> DISPATCHING -> AGGREGATING`
/// before one of the terminal statuses.
#[derive(Debug, Clone, Copy)]
enum UnitPhase {
    Chunking,
    Dispatching,
    Aggregating,
}

fn enter(unit: &str, phase: UnitPhase) {
    log::debug!("unit {unit}: {phase:?}");
}

/// Composes fingerprinting, chunking, caching, dispatch, and aggregation
/// into unit-level and project-level analysis runs.
///
/// The worker pool bounds concurrent model-capability calls across all
/// units of a run. The pipeline never retries a unit; retries belong to
/// the dispatcher, per chunk.
pub struct Pipeline {
    config: AnalysisConfig,
    chunker: Chunker,
    dispatcher: Arc<Dispatcher>,
    workers: Arc<Semaphore>,
    cancel: CancelToken,
    model_id: String,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        cache: Arc<dyn CacheStore>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        config.validate().map_err(AnalyzerError::InvalidConfig)?;

        let chunker = Chunker::new(config.max_chunk_bytes, config.overlap_lines)?;
        let model_id = provider.model_id().to_string();
        let dispatcher = Arc::new(Dispatcher::new(provider, cache, &config));
        let workers = Arc::new(Semaphore::new(config.max_concurrency));

        Ok(Self {
            config,
            chunker,
            dispatcher,
            workers,
            cancel: CancelToken::new(),
            model_id,
        })
    }

    /// Token callers can use to abort the run from another task.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one unit end to end. Failures are folded into the result's
    /// status rather than returned; a chunking failure short-circuits to
    /// FAILED without invoking the dispatcher.
    pub async fn analyze_unit(&self, unit: &SourceUnit) -> AnalysisResult {
        let started = Instant::now();
        let language = unit.language.as_str().to_string();

        enter(&unit.name, UnitPhase::Chunking);
        let unit_fingerprint =
            fingerprint_unit(unit.content.as_bytes(), &self.config, &self.model_id);
        let chunks = match self.chunker.chunk(unit, &unit_fingerprint) {
            Ok(chunks) => chunks,
            Err(e) => {
                log::warn!("unit {} failed to chunk: {e}", unit.name);
                let mut result = AnalysisResult::failed(&unit.name, &language, e.to_string());
                result.elapsed_ms = elapsed_ms(started);
                return result;
            }
        };

        enter(&unit.name, UnitPhase::Dispatching);
        let deadline = self
            .config
            .unit_budget_ms
            .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));

        let mut tasks = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let dispatcher = Arc::clone(&self.dispatcher);
            let workers = Arc::clone(&self.workers);
            let cancel = self.cancel.clone();
            let language = language.clone();
            let meta = (chunk.index, chunk.start_line, chunk.end_line);

            let handle = tokio::spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .unwrap_or_else(|_| unreachable!("worker pool semaphore closed"));
                if cancel.is_cancelled() {
                    return Err(InferenceError::Cancelled);
                }
                dispatcher.analyze(&chunk, &language).await
            });
            tasks.push((meta, handle));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for ((index, start_line, end_line), mut handle) in tasks {
            let result = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(joined) => flatten_join(joined),
                    Err(_) => {
                        handle.abort();
                        Err(InferenceError::Timeout)
                    }
                },
                None => flatten_join(handle.await),
            };
            outcomes.push(ChunkOutcome {
                index,
                start_line,
                end_line,
                result,
            });
        }

        enter(&unit.name, UnitPhase::Aggregating);
        let mut result = aggregate::merge(
            &unit.name,
            &language,
            outcomes,
            self.config.max_findings_per_unit,
        );
        result.elapsed_ms = elapsed_ms(started);

        log::info!(
            "unit {} {:?}: {} findings, {} chunk errors in {}ms",
            result.unit,
            result.status,
            result.findings.len(),
            result.chunk_errors.len(),
            result.elapsed_ms
        );
        result
    }

    /// Read a unit from disk and analyze it. Read failures become FAILED
    /// results, matching the chunker's unreadable-unit semantics.
    pub async fn analyze_path(&self, path: &Path) -> AnalysisResult {
        let name = path.to_string_lossy().to_string();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => self.analyze_unit(&SourceUnit::new(name, content)).await,
            Err(e) => {
                let language = refine_code_chunker::Language::from_path(path);
                AnalysisResult::failed(
                    &name,
                    language.as_str(),
                    format!("unreadable unit {name}: {e}"),
                )
            }
        }
    }

    /// Analyze every unit under `root`. Unit failures never abort sibling
    /// units; results come back sorted by unit name.
    pub async fn analyze_project(self: &Arc<Self>, root: &Path) -> Result<Vec<AnalysisResult>> {
        self.analyze_project_with(root, |_| {}).await
    }

    /// Project run with a completion callback per unit (progress bars,
    /// streaming reporters).
    pub async fn analyze_project_with<F>(
        self: &Arc<Self>,
        root: &Path,
        on_unit: F,
    ) -> Result<Vec<AnalysisResult>>
    where
        F: Fn(&AnalysisResult) + Send + Sync,
    {
        if !root.exists() {
            return Err(AnalyzerError::InvalidPath(root.display().to_string()));
        }

        let scanner = UnitScanner::new(root, &self.config)?;
        let files = scanner.scan();

        let mut handles = Vec::with_capacity(files.len());
        for path in files {
            if self.cancel.is_cancelled() {
                log::info!("run cancelled; not scheduling further units");
                break;
            }
            let pipeline = Arc::clone(self);
            handles.push(tokio::spawn(
                async move { pipeline.analyze_path(&path).await },
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => {
                    on_unit(&result);
                    results.push(result);
                }
                Err(e) => log::warn!("unit analysis task panicked: {e}"),
            }
        }

        results.sort_by(|a, b| a.unit.cmp(&b.unit));
        Ok(results)
    }
}

fn flatten_join(
    joined: std::result::Result<
        std::result::Result<Vec<refine_protocol::Finding>, InferenceError>,
        tokio::task::JoinError,
    >,
) -> std::result::Result<Vec<refine_protocol::Finding>, InferenceError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(InferenceError::Timeout),
        Err(e) => Err(InferenceError::fatal(format!("analysis task failed: {e}"))),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
