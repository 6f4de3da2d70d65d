use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of issue a finding describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Bug,
    Security,
    Performance,
    Style,
    Documentation,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "BUG",
            Self::Security => "SECURITY",
            Self::Performance => "PERFORMANCE",
            Self::Style => "STYLE",
            Self::Documentation => "DOCUMENTATION",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a finding. Variants are ordered ascending so `Ord` can be used
/// directly for ranking; reports sort descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Info => "INFO",
        }
    }

    /// Parse a severity token as emitted by the model capability.
    #[must_use]
    pub fn parse_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            "INFO" | "INFORMATIONAL" => Some(Self::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive 1-based line range in some coordinate space (chunk-local until
/// the aggregator translates it, unit-global afterwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        let start = start.max(1);
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Single-line range
    #[must_use]
    pub fn line(line: usize) -> Self {
        Self::new(line, line)
    }

    /// True when the ranges overlap or touch (end of one directly precedes
    /// the start of the other).
    #[must_use]
    pub const fn overlaps_or_adjacent(&self, other: &Self) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    /// Shift a chunk-local range into unit coordinates, clamping into the
    /// chunk's own span so a confused model cannot place findings outside
    /// the code it saw.
    #[must_use]
    pub fn translate(&self, chunk_start_line: usize, chunk_end_line: usize) -> Self {
        let start = (chunk_start_line + self.start - 1).min(chunk_end_line);
        let end = (chunk_start_line + self.end - 1).min(chunk_end_line);
        Self::new(start, end)
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One reported issue. A pure value object: equality over content is the
/// only identity findings have.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub range: LineRange,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    #[must_use]
    pub fn new(
        category: Category,
        severity: Severity,
        range: LineRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            range,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Builder: attach a suggested fix
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Message with all whitespace runs collapsed to single spaces.
    #[must_use]
    pub fn normalized_message(&self) -> String {
        self.message.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Duplicate rule: same category and severity, overlapping or adjacent
    /// ranges, and messages equal after whitespace normalization. Fuzzy text
    /// similarity is deliberately not attempted.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.category == other.category
            && self.severity == other.severity
            && self.range.overlaps_or_adjacent(&other.range)
            && self.normalized_message() == other.normalized_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn severity_orders_ascending() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn severity_parses_model_tokens() {
        assert_eq!(Severity::parse_token("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse_token(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::parse_token("INFORMATIONAL"), Some(Severity::Info));
        assert_eq!(Severity::parse_token("bogus"), None);
    }

    #[test]
    fn range_overlap_and_adjacency() {
        let a = LineRange::new(10, 14);
        assert!(a.overlaps_or_adjacent(&LineRange::new(12, 20)));
        assert!(a.overlaps_or_adjacent(&LineRange::new(15, 15)));
        assert!(a.overlaps_or_adjacent(&LineRange::new(5, 9)));
        assert!(!a.overlaps_or_adjacent(&LineRange::new(16, 20)));
        assert!(!a.overlaps_or_adjacent(&LineRange::new(1, 8)));
    }

    #[test]
    fn range_translation_clamps_to_chunk() {
        // Chunk occupies global lines 41..=60; local line 2 is global 42.
        let local = LineRange::line(2);
        assert_eq!(local.translate(41, 60), LineRange::line(42));

        // A range past the chunk end clamps to the chunk's last line.
        let runaway = LineRange::new(50, 90);
        assert_eq!(runaway.translate(41, 60), LineRange::new(60, 60));
    }

    #[test]
    fn duplicate_rule_normalizes_whitespace() {
        let a = Finding::new(
            Category::Bug,
            Severity::High,
            LineRange::line(42),
            "unused   variable x",
        );
        let b = Finding::new(
            Category::Bug,
            Severity::High,
            LineRange::new(42, 43),
            "unused variable x",
        );
        assert!(a.is_duplicate_of(&b));

        let c = Finding::new(
            Category::Style,
            Severity::High,
            LineRange::line(42),
            "unused variable x",
        );
        assert!(!a.is_duplicate_of(&c));
    }
}
