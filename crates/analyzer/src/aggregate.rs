use refine_code_chunker::Chunk;
use refine_inference::InferenceError;
use refine_protocol::{AnalysisResult, ChunkFailure, Finding, UnitStatus};

/// What one chunk's analysis produced, plus the coordinates needed to map
/// findings back into the unit.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub result: Result<Vec<Finding>, InferenceError>,
}

impl ChunkOutcome {
    #[must_use]
    pub fn new(chunk: &Chunk, result: Result<Vec<Finding>, InferenceError>) -> Self {
        Self {
            index: chunk.index,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            result,
        }
    }
}

/// Merge per-chunk outcomes into one unit result.
///
/// Outcomes may arrive in any completion order; they are re-ordered by
/// chunk index first, so the merged output is deterministic. Findings are
/// translated to unit coordinates, de-duplicated (overlap makes duplicates
/// expected, not exceptional), and sorted by severity descending, then line
/// range, then category name. `max_findings` of 0 means unlimited.
#[must_use]
pub fn merge(
    unit: &str,
    language: &str,
    mut outcomes: Vec<ChunkOutcome>,
    max_findings: usize,
) -> AnalysisResult {
    outcomes.sort_by_key(|outcome| outcome.index);

    let mut translated: Vec<Finding> = Vec::new();
    let mut chunk_errors = Vec::new();
    let mut succeeded = 0usize;

    for outcome in outcomes {
        match outcome.result {
            Ok(findings) => {
                succeeded += 1;
                for mut finding in findings {
                    finding.range = finding.range.translate(outcome.start_line, outcome.end_line);
                    translated.push(finding);
                }
            }
            Err(error) => chunk_errors.push(ChunkFailure {
                chunk_index: outcome.index,
                error: error.to_string(),
            }),
        }
    }

    let mut warnings = Vec::new();
    let mut findings: Vec<Finding> = Vec::new();
    for candidate in translated {
        match findings.iter().find(|kept| kept.is_duplicate_of(&candidate)) {
            None => findings.push(candidate),
            Some(kept) => {
                if kept.suggestion != candidate.suggestion {
                    // Same finding, different fixes: keep both rather than
                    // silently dropping data.
                    warnings.push(format!(
                        "conflicting suggestions for duplicate finding at lines {}; retaining both",
                        candidate.range
                    ));
                    findings.push(candidate);
                }
            }
        }
    }

    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.range.start.cmp(&b.range.start))
            .then(a.range.end.cmp(&b.range.end))
            .then(a.category.as_str().cmp(b.category.as_str()))
    });

    if max_findings > 0 && findings.len() > max_findings {
        warnings.push(format!(
            "finding cap reached; dropped {} lower-ranked findings",
            findings.len() - max_findings
        ));
        findings.truncate(max_findings);
    }

    let status = if chunk_errors.is_empty() && succeeded > 0 {
        UnitStatus::Complete
    } else if succeeded > 0 {
        UnitStatus::Partial
    } else {
        UnitStatus::Failed
    };

    AnalysisResult {
        unit: unit.to_string(),
        language: language.to_string(),
        status,
        findings,
        chunk_errors,
        warnings,
        elapsed_ms: 0,
    }
}
