use once_cell::sync::Lazy;
use refine_protocol::{Category, Finding, LineRange, Severity};
use regex::Regex;

static BLOCK_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*SEVERITY:").expect("valid regex"));
static SEVERITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SEVERITY:\s*([A-Za-z]+)").expect("valid regex"));
static LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)LINE:\s*(\d+)(?:\s*-\s*(\d+))?").expect("valid regex"));
static ISSUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)ISSUE:\s*(.+?)(?:IMPACT:|SOLUTION:|$)").expect("valid regex")
});
static IMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)IMPACT:\s*(.+?)(?:SOLUTION:|$)").expect("valid regex"));
static SOLUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)SOLUTION:\s*(.+?)$").expect("valid regex"));
static LOOSE_SEVERITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(CRITICAL|HIGH|MEDIUM|LOW|INFO)\b").expect("valid regex"));
static LOOSE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)line\s+(\d+)").expect("valid regex"));

/// Extract findings from the model's textual response.
///
/// Primary format is the SEVERITY/LINE/ISSUE/IMPACT/SOLUTION block contract
/// the prompts request; a lenient line-oriented fallback handles models
/// that answer in prose. Line numbers are left chunk-local.
#[must_use]
pub fn parse_findings(response: &str) -> Vec<Finding> {
    let lowered = response.to_lowercase();
    if lowered.contains("no significant issues found") || lowered.contains("no issues found") {
        return Vec::new();
    }

    let findings = parse_structured(response);
    if !findings.is_empty() {
        return findings;
    }

    parse_loose(response)
}

fn parse_structured(response: &str) -> Vec<Finding> {
    let starts: Vec<usize> = BLOCK_START.find_iter(response).map(|m| m.start()).collect();
    let mut findings = Vec::new();

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(response.len());
        if let Some(finding) = parse_block(&response[start..end]) {
            findings.push(finding);
        }
    }

    findings
}

fn parse_block(block: &str) -> Option<Finding> {
    let severity = Severity::parse_token(SEVERITY.captures(block)?.get(1)?.as_str())?;

    let range = match LINE.captures(block) {
        Some(caps) => {
            let start = caps.get(1)?.as_str().parse().ok()?;
            let end = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(start);
            LineRange::new(start, end)
        }
        None => LineRange::line(1),
    };

    let issue = ISSUE
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())?;

    let mut message = issue;
    if let Some(impact) = IMPACT
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    {
        message.push_str(" Impact: ");
        message.push_str(impact);
    }

    let mut finding = Finding::new(categorize(&message), severity, range, message);
    if let Some(solution) = SOLUTION
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    {
        finding = finding.with_suggestion(solution);
    }

    Some(finding)
}

/// Lenient fallback for unstructured responses: any line naming a severity
/// starts a finding, "line N" references pin it down.
fn parse_loose(response: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for line in response.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(caps) = LOOSE_SEVERITY.captures(trimmed) else {
            continue;
        };
        let Some(severity) = Severity::parse_token(&caps[1]) else {
            continue;
        };

        let at = LOOSE_LINE
            .captures(trimmed)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(1);

        findings.push(Finding::new(
            categorize(trimmed),
            severity,
            LineRange::line(at),
            trimmed,
        ));
    }

    findings
}

/// Keyword-based category assignment from the finding text.
fn categorize(description: &str) -> Category {
    let lowered = description.to_lowercase();

    const SECURITY: &[&str] = &[
        "security",
        "sql injection",
        "xss",
        "vulnerab",
        "authentication",
        "authorization",
        "secret",
        "path traversal",
    ];
    const PERFORMANCE: &[&str] = &[
        "performance",
        "slow",
        "inefficien",
        "optimiz",
        "memory leak",
        "allocation",
        "complexity",
    ];
    const STYLE: &[&str] = &["style", "naming", "convention", "format", "unused"];
    const DOCUMENTATION: &[&str] = &["documentation", "docstring", "doc comment", "comment"];

    if SECURITY.iter().any(|kw| lowered.contains(kw)) {
        Category::Security
    } else if PERFORMANCE.iter().any(|kw| lowered.contains(kw)) {
        Category::Performance
    } else if DOCUMENTATION.iter().any(|kw| lowered.contains(kw)) {
        Category::Documentation
    } else if STYLE.iter().any(|kw| lowered.contains(kw)) {
        Category::Style
    } else {
        Category::Bug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_sentinel_yields_no_findings() {
        assert!(parse_findings("No significant issues found.").is_empty());
        assert!(parse_findings("Looked carefully. No issues found!").is_empty());
    }

    #[test]
    fn parses_a_structured_block() {
        let response = "\
SEVERITY: HIGH
LINE: 12
ISSUE: Unchecked division by user input
IMPACT: Panics when the divisor is zero
SOLUTION: Validate the divisor before dividing";

        let findings = parse_findings(response);
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.range, LineRange::line(12));
        assert!(finding.message.contains("Unchecked division"));
        assert!(finding.message.contains("Impact: Panics"));
        assert_eq!(
            finding.suggestion.as_deref(),
            Some("Validate the divisor before dividing")
        );
    }

    #[test]
    fn parses_multiple_blocks_and_line_ranges() {
        let response = "\
SEVERITY: CRITICAL
LINE: 3-7
ISSUE: SQL injection via string concatenation
SOLUTION: Use parameterized queries

SEVERITY: LOW
LINE: 20
ISSUE: Inconsistent naming convention
SOLUTION: Rename to snake_case";

        let findings = parse_findings(response);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].range, LineRange::new(3, 7));
        assert_eq!(findings[0].category, Category::Security);
        assert_eq!(findings[1].category, Category::Style);
    }

    #[test]
    fn block_without_severity_is_skipped() {
        let response = "\
SEVERITY: SOMETIMES
LINE: 4
ISSUE: Not a real severity";
        assert!(parse_findings(response).is_empty());
    }

    #[test]
    fn falls_back_to_loose_parsing() {
        let response = "The function at line 42 has a HIGH risk memory leak in the loop.";
        let findings = parse_findings(response);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].range, LineRange::line(42));
        assert_eq!(findings[0].category, Category::Performance);
    }

    #[test]
    fn categorization_covers_the_taxonomy() {
        assert_eq!(categorize("possible sql injection"), Category::Security);
        assert_eq!(categorize("inefficient nested loop"), Category::Performance);
        assert_eq!(categorize("missing docstring"), Category::Documentation);
        assert_eq!(categorize("unused variable x"), Category::Style);
        assert_eq!(categorize("off by one error"), Category::Bug);
    }
}
