use crate::finding::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal state of a unit analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitStatus {
    /// Every chunk produced findings (possibly none)
    Complete,
    /// At least one chunk failed, at least one succeeded
    Partial,
    /// Every chunk failed, or the unit never reached dispatch
    Failed,
}

/// A chunk-level error attached to a PARTIAL or FAILED result, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_index: usize,
    pub error: String,
}

/// Per-unit outcome handed to formatters. Findings are already translated
/// into unit coordinates, de-duplicated, and sorted (severity descending,
/// then line range, then category name); formatters perform no further
/// ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Path or logical name of the analyzed unit
    pub unit: String,
    pub language: String,
    pub status: UnitStatus,
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunk_errors: Vec<ChunkFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Wall-clock time spent on this unit, in milliseconds
    pub elapsed_ms: u64,
}

impl AnalysisResult {
    /// Result for a unit that never reached dispatch (chunking failed,
    /// unreadable input, and similar unit-fatal conditions).
    #[must_use]
    pub fn failed(unit: impl Into<String>, language: impl Into<String>, error: String) -> Self {
        Self {
            unit: unit.into(),
            language: language.into(),
            status: UnitStatus::Failed,
            findings: Vec::new(),
            chunk_errors: vec![ChunkFailure {
                chunk_index: 0,
                error,
            }],
            warnings: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// Findings counted per severity, for summaries.
    #[must_use]
    pub fn severity_breakdown(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Category, LineRange};
    use pretty_assertions::assert_eq;

    #[test]
    fn failed_result_carries_the_error() {
        let result = AnalysisResult::failed("src/a.rs", "rust", "empty unit".to_string());
        assert_eq!(result.status, UnitStatus::Failed);
        assert!(result.findings.is_empty());
        assert_eq!(result.chunk_errors.len(), 1);
        assert_eq!(result.chunk_errors[0].error, "empty unit");
    }

    #[test]
    fn breakdown_counts_by_severity() {
        let mut result = AnalysisResult::failed("u", "rust", "x".to_string());
        result.findings = vec![
            Finding::new(Category::Bug, Severity::High, LineRange::line(1), "a"),
            Finding::new(Category::Bug, Severity::High, LineRange::line(2), "b"),
            Finding::new(Category::Style, Severity::Low, LineRange::line(3), "c"),
        ];
        let counts = result.severity_breakdown();
        assert_eq!(counts.get(&Severity::High), Some(&2));
        assert_eq!(counts.get(&Severity::Low), Some(&1));
    }
}
