use crate::provider::InferenceRequest;
use refine_protocol::AnalysisFocus;

const OUTPUT_FORMAT: &str = "\
For each issue found, answer in exactly this format:

SEVERITY: [CRITICAL/HIGH/MEDIUM/LOW/INFO]
LINE: [line number or range within the snippet]
ISSUE: [what is wrong]
IMPACT: [what could go wrong]
SOLUTION: [concrete fix]

If the code is sound, answer \"No significant issues found.\"";

/// Render the prompt payload for one chunk.
///
/// Line numbers referenced by the model are relative to the snippet, which
/// is why findings come back chunk-local.
#[must_use]
pub fn render_prompt(request: &InferenceRequest) -> String {
    let preamble = match request.focus {
        AnalysisFocus::Comprehensive => {
            "You are an expert code reviewer. Analyze the code below for bugs and logic \
             errors, security vulnerabilities, performance problems, style issues, and \
             documentation gaps. Report only real issues with exact line numbers."
        }
        AnalysisFocus::Security => {
            "You are a security reviewer. Analyze the code below strictly for security \
             vulnerabilities: injection, authentication and authorization flaws, input \
             validation, cryptographic weaknesses, secrets exposure, race conditions, \
             and path traversal. Report only actual security concerns."
        }
        AnalysisFocus::Performance => {
            "You are a performance reviewer. Analyze the code below strictly for \
             performance problems: algorithmic complexity, unnecessary allocations and \
             copies, inefficient queries and IO, missed caching, and data structure \
             choices. Report only measurable inefficiencies."
        }
    };

    let truncation_note = if request.oversized {
        "\nNote: this snippet is a single oversized line and may be truncated.\n"
    } else {
        ""
    };

    format!(
        "{preamble}\n\n{OUTPUT_FORMAT}\n{truncation_note}\n```{}\n{}\n```\n",
        request.language, request.code
    )
}

/// Cut a payload down to `max_bytes` at a character boundary, appending a
/// marker the model can see.
#[must_use]
pub fn truncate_code(code: &str, max_bytes: usize) -> String {
    if code.len() <= max_bytes {
        return code.to_string();
    }
    let mut cut = max_bytes;
    while cut > 0 && !code.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n[truncated]", &code[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(focus: AnalysisFocus) -> InferenceRequest {
        InferenceRequest {
            code: "fn main() {}".to_string(),
            language: "rust".to_string(),
            focus,
            oversized: false,
        }
    }

    #[test]
    fn prompt_embeds_code_and_language() {
        let prompt = render_prompt(&request(AnalysisFocus::Comprehensive));
        assert!(prompt.contains("```rust"));
        assert!(prompt.contains("fn main() {}"));
        assert!(prompt.contains("SEVERITY:"));
    }

    #[test]
    fn focus_selects_the_preamble() {
        let security = render_prompt(&request(AnalysisFocus::Security));
        assert!(security.contains("security reviewer"));

        let performance = render_prompt(&request(AnalysisFocus::Performance));
        assert!(performance.contains("performance reviewer"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let code = "é".repeat(10);
        let cut = truncate_code(&code, 5);
        assert!(cut.ends_with("[truncated]"));
        assert!(cut.len() < code.len() + 12);

        let untouched = truncate_code("short", 100);
        assert_eq!(untouched, "short");
    }
}
