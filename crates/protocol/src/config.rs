use serde::{Deserialize, Serialize};

/// Which analysis the model capability is asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisFocus {
    /// Bugs, security, performance, style, and documentation in one pass
    Comprehensive,
    Security,
    Performance,
}

impl AnalysisFocus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comprehensive => "comprehensive",
            Self::Security => "security",
            Self::Performance => "performance",
        }
    }
}

impl Default for AnalysisFocus {
    fn default() -> Self {
        Self::Comprehensive
    }
}

/// Configuration for a whole analysis run.
///
/// The output-affecting subset (focus and chunk geometry) participates in
/// fingerprints via [`AnalysisConfig::canonical_string`]; scheduling knobs
/// (retries, concurrency, budgets) deliberately do not, so tuning them never
/// invalidates the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub focus: AnalysisFocus,

    /// Hard cap on a chunk's body size, in bytes. A single line longer than
    /// this is emitted as one oversized chunk rather than split mid-line.
    pub max_chunk_bytes: usize,

    /// Lines of trailing context repeated at the head of the next chunk
    pub overlap_lines: usize,

    /// Findings kept per unit after sorting (highest severity first)
    pub max_findings_per_unit: usize,

    /// Files larger than this are skipped during project scans
    pub max_file_bytes: u64,

    /// Glob patterns selecting units in a project scan (empty = any file
    /// with a recognized language)
    pub include: Vec<String>,

    /// Glob patterns excluded from project scans
    pub ignore: Vec<String>,

    /// Additional inference attempts after the first, on transient errors
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,

    /// Timeout per inference attempt (not per unit)
    pub attempt_timeout_ms: u64,

    /// Maximum concurrent model-capability calls outstanding
    pub max_concurrency: usize,

    /// Optional wall-clock budget per unit; expiry fails the unit's
    /// unfinished chunks without touching other units
    pub unit_budget_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            focus: AnalysisFocus::Comprehensive,
            max_chunk_bytes: 16 * 1024,
            overlap_lines: 4,
            max_findings_per_unit: 20,
            max_file_bytes: 1_000_000,
            include: Vec::new(),
            ignore: Vec::new(),
            max_retries: 3,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 10_000,
            attempt_timeout_ms: 60_000,
            max_concurrency: 4,
            unit_budget_ms: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_bytes == 0 {
            return Err("max_chunk_bytes must be > 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be > 0".to_string());
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(format!(
                "retry_base_delay_ms ({}) cannot exceed retry_max_delay_ms ({})",
                self.retry_base_delay_ms, self.retry_max_delay_ms
            ));
        }
        Ok(())
    }

    /// Canonical encoding of the fields that change what the model produces.
    /// Any edit to one of these lines changes every fingerprint derived from
    /// this configuration.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        format!(
            "focus={};max_chunk_bytes={};overlap_lines={};max_findings_per_unit={}",
            self.focus.as_str(),
            self.max_chunk_bytes,
            self.overlap_lines,
            self.max_findings_per_unit,
        )
    }
}
