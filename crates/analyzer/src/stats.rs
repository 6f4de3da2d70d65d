use refine_protocol::{AnalysisResult, Severity, UnitStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics for one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub units: usize,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
    pub findings: usize,
    pub failed_chunks: usize,
    /// Findings counted per severity name
    pub by_severity: BTreeMap<String, usize>,
    pub time_ms: u64,
}

impl AnalysisStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &AnalysisResult) {
        self.units += 1;
        match result.status {
            UnitStatus::Complete => self.complete += 1,
            UnitStatus::Partial => self.partial += 1,
            UnitStatus::Failed => self.failed += 1,
        }
        self.findings += result.findings.len();
        self.failed_chunks += result.chunk_errors.len();
        for (severity, count) in result.severity_breakdown() {
            *self
                .by_severity
                .entry(severity.as_str().to_string())
                .or_insert(0) += count;
        }
    }

    /// Highest severity seen across the run, for exit-code decisions.
    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ]
        .into_iter()
        .find(|severity| self.by_severity.contains_key(severity.as_str()))
    }
}
